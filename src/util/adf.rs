use serde_json::{json, Value};

/// Build an Atlassian Document Format document from plain text, one paragraph
/// per non-empty line. Jira v3 issue descriptions and comments require ADF.
pub fn text_doc(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": line }]
            })
        })
        .collect();

    json!({
        "type": "doc",
        "version": 1,
        "content": paragraphs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_becomes_one_paragraph() {
        let doc = text_doc("Book flight by Friday");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        let content = doc["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["content"][0]["text"], "Book flight by Friday");
    }

    #[test]
    fn blank_lines_are_dropped() {
        let doc = text_doc("first\n\n  \nsecond");
        let content = doc["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[1]["content"][0]["text"], "second");
    }
}
