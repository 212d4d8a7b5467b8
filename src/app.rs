use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::KeyAction;
use crate::model::task::{Draft, Task, TaskStatus};
use crate::sync::Lifecycle;
use crate::tracker::TrackerUser;

#[derive(Debug, Clone)]
pub enum Action {
    Key(KeyAction),
    Tick,
    TasksLoaded(Vec<Task>),
    /// A wake probe failed; the payload is the attempt count so far.
    WakeProbe(u32),
    BackendAwake,
    /// A draft handed over by `snag capture` through the socket.
    CaptureRequested(Draft),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Pending,
    Sent,
    Declined,
}

impl StatusFilter {
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::Sent,
            StatusFilter::Sent => StatusFilter::Declined,
            StatusFilter::Declined => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Pending => "pending",
            StatusFilter::Sent => "sent",
            StatusFilter::Declined => "declined",
        }
    }

    /// The default view hides declined tasks; they have their own filter.
    pub fn admits(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => task.status != TaskStatus::Declined,
            StatusFilter::Pending => task.status == TaskStatus::Pending,
            StatusFilter::Sent => task.status == TaskStatus::Sent,
            StatusFilter::Declined => task.status == TaskStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    /// Full list plus detail panel.
    Dashboard,
    /// Compact pending-only list, for working the queue down.
    Focus,
    /// Capture confirmation form.
    Capture,
    /// Assignee picker on the way to a send.
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureField {
    Title,
    Priority,
    Deadline,
}

impl CaptureField {
    fn next(self) -> Self {
        match self {
            CaptureField::Title => CaptureField::Priority,
            CaptureField::Priority => CaptureField::Deadline,
            CaptureField::Deadline => CaptureField::Title,
        }
    }

    fn prev(self) -> Self {
        self.next().next()
    }
}

#[derive(Debug, Clone)]
pub struct CaptureForm {
    pub draft: Draft,
    pub title_input: String,
    pub deadline_input: String,
    pub field: CaptureField,
    pub error: Option<String>,
}

impl CaptureForm {
    pub fn new(draft: Draft) -> Self {
        let title_input = if draft.text.is_empty() {
            String::new()
        } else {
            draft.effective_title()
        };
        let deadline_input = draft
            .deadline
            .map(|d| d.to_string())
            .unwrap_or_default();
        Self {
            draft,
            title_input,
            deadline_input,
            field: CaptureField::Title,
            error: None,
        }
    }
}

pub struct App {
    pub tasks: Vec<Task>,
    pub selected: usize,
    pub filter: StatusFilter,
    pub view_mode: ViewMode,
    pub loading: bool,
    /// `Some(n)` while the standby screen is up, n = failed wake probes.
    pub waking: Option<u32>,
    pub flash_message: Option<(String, Instant)>,
    pub capture: Option<CaptureForm>,
    pub confirm_clear: bool,
    pub assignable: Vec<TrackerUser>,
    pub selected_user: usize,
    pub assign_task_id: Option<String>,
    pub should_quit: bool,
    pub action_tx: mpsc::UnboundedSender<Action>,
    pub lifecycle: Lifecycle,
    pub wake_cancel: CancellationToken,
    ticks: u64,
}

impl App {
    pub fn new(
        lifecycle: Lifecycle,
        action_tx: mpsc::UnboundedSender<Action>,
        initial_draft: Option<Draft>,
    ) -> Self {
        // Show the mirror immediately; the store merge lands once awake.
        let tasks = lifecycle.cache.get();
        let view_mode = if initial_draft.is_some() {
            ViewMode::Capture
        } else {
            ViewMode::Dashboard
        };
        Self {
            tasks,
            selected: 0,
            filter: StatusFilter::All,
            view_mode,
            loading: false,
            waking: Some(0),
            flash_message: None,
            capture: initial_draft.map(CaptureForm::new),
            confirm_clear: false,
            assignable: Vec::new(),
            selected_user: 0,
            assign_task_id: None,
            should_quit: false,
            action_tx,
            lifecycle,
            wake_cancel: CancellationToken::new(),
            ticks: 0,
        }
    }

    /// Tasks the current view shows, in mirror (newest-first) order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        let filter = match self.view_mode {
            ViewMode::Focus => StatusFilter::Pending,
            _ => self.filter,
        };
        self.tasks.iter().filter(|t| filter.admits(t)).collect()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.selected).copied()
    }

    pub async fn update(&mut self, action: Action) {
        // Clear flash message after 3 seconds
        if let Some((_, t)) = &self.flash_message {
            if t.elapsed().as_secs() >= 3 {
                self.flash_message = None;
            }
        }

        match action {
            Action::Key(key) => self.handle_key(key).await,
            Action::Tick => self.handle_tick().await,
            Action::TasksLoaded(tasks) => {
                self.tasks = tasks;
                self.loading = false;
                let visible = self.visible_tasks().len();
                if self.selected >= visible && visible > 0 {
                    self.selected = visible - 1;
                }
            }
            Action::WakeProbe(n) => {
                if let Some(attempts) = &mut self.waking {
                    *attempts = n;
                }
            }
            Action::BackendAwake => self.handle_awake().await,
            Action::CaptureRequested(draft) => {
                self.capture = Some(CaptureForm::new(draft));
                self.view_mode = ViewMode::Capture;
            }
            Action::Quit => {
                self.wake_cancel.cancel();
                self.should_quit = true;
            }
        }
    }

    /// First awake signal dismisses the standby screen and syncs; a
    /// redundant one (the immediate and interval probes can both land) is a
    /// no-op.
    async fn handle_awake(&mut self) {
        if self.waking.take().is_none() {
            return;
        }
        let added = self.lifecycle.sync_from_backend().await;
        if added > 0 {
            self.flash(format!("Task store awake, {added} new"));
        } else {
            self.flash("Task store awake");
        }
        self.refresh().await;
    }

    async fn handle_tick(&mut self) {
        self.ticks += 1;
        // Periodic background refresh keeps tracker mirroring fresh.
        if self.waking.is_none() && self.view_mode != ViewMode::Capture && self.ticks % 15 == 0 {
            self.refresh().await;
        }
    }

    async fn handle_key(&mut self, key: KeyAction) {
        if self.confirm_clear {
            match key {
                KeyAction::Char('y') => {
                    self.confirm_clear = false;
                    match self.lifecycle.clear_all().await {
                        Ok(count) => self.flash(format!("Cleared {count} tasks")),
                        Err(err) => self.flash(format!("Clear failed: {err}")),
                    }
                    self.refresh().await;
                }
                _ => {
                    self.confirm_clear = false;
                    self.flash("Clear cancelled");
                }
            }
            return;
        }

        match self.view_mode {
            ViewMode::Capture => self.handle_capture_key(key).await,
            ViewMode::Assign => self.handle_assign_key(key).await,
            _ => self.handle_list_key(key).await,
        }
    }

    async fn handle_list_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyAction::Down => {
                let visible = self.visible_tasks().len();
                if visible > 0 && self.selected < visible - 1 {
                    self.selected += 1;
                }
            }
            KeyAction::Tab => {
                if self.view_mode == ViewMode::Dashboard {
                    self.filter = self.filter.next();
                    self.selected = 0;
                }
            }
            KeyAction::Char('f') => {
                self.view_mode = if self.view_mode == ViewMode::Focus {
                    ViewMode::Dashboard
                } else {
                    ViewMode::Focus
                };
                self.selected = 0;
            }
            KeyAction::Char('q') => {
                self.wake_cancel.cancel();
                self.should_quit = true;
            }
            KeyAction::Char('r') => {
                self.flash("Refreshing...");
                self.refresh().await;
            }
            KeyAction::Char('n') => {
                self.capture = Some(CaptureForm::new(Draft::new("", None, None)));
                self.view_mode = ViewMode::Capture;
            }
            KeyAction::Char('s') => {
                if let Some(id) = self.selected_task().map(|t| t.id.clone()) {
                    self.send_task(&id, None).await;
                }
            }
            KeyAction::Char('a') => self.open_assign().await,
            KeyAction::Char('d') => self.decline_selected().await,
            KeyAction::Char('u') => self.restore_selected().await,
            KeyAction::Char('x') => self.delete_selected().await,
            KeyAction::Char('C') => {
                self.confirm_clear = true;
            }
            _ => {}
        }
    }

    async fn send_task(&mut self, id: &str, assignee: Option<&str>) {
        match self.lifecycle.send_task(id, assignee).await {
            Ok(issue) => self.flash(format!("{} created", issue.key)),
            Err(err) => self.flash(format!("Send failed: {err}")),
        }
        self.refresh().await;
    }

    async fn open_assign(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let (id, can_send) = (task.id.clone(), task.can_send());
        if !can_send {
            self.flash("Only unsent pending tasks can be assigned");
            return;
        }

        let Some(tracker) = &self.lifecycle.tracker else {
            self.flash("Jira is not configured");
            return;
        };
        match tracker.search_users("").await {
            Ok(users) if !users.is_empty() => {
                self.assignable = users;
                self.selected_user = 0;
                self.assign_task_id = Some(id);
                self.view_mode = ViewMode::Assign;
            }
            Ok(_) => self.flash("No assignable users found"),
            Err(err) => self.flash(format!("User search failed: {err}")),
        }
    }

    async fn decline_selected(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let (id, status) = (task.id.clone(), task.status);
        if status != TaskStatus::Pending {
            self.flash(format!("Cannot decline a {status} task"));
            return;
        }
        match self.lifecycle.decline_task(&id).await {
            Ok(()) => self.flash("Declined"),
            Err(err) => self.flash(format!("Decline failed: {err}")),
        }
        self.refresh().await;
    }

    async fn restore_selected(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let (id, status) = (task.id.clone(), task.status);
        if status != TaskStatus::Declined {
            self.flash(format!("Cannot restore a {status} task"));
            return;
        }
        match self.lifecycle.restore_task(&id).await {
            Ok(()) => self.flash("Restored to pending"),
            Err(err) => self.flash(format!("Restore failed: {err}")),
        }
        self.refresh().await;
    }

    async fn delete_selected(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let id = task.id.clone();
        match self.lifecycle.delete_task(&id).await {
            Ok(()) => self.flash("Deleted"),
            Err(err) => self.flash(format!("Delete failed: {err}")),
        }
        self.refresh().await;
    }

    async fn handle_assign_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Up => {
                if self.selected_user > 0 {
                    self.selected_user -= 1;
                }
            }
            KeyAction::Down => {
                if !self.assignable.is_empty() && self.selected_user < self.assignable.len() - 1 {
                    self.selected_user += 1;
                }
            }
            KeyAction::Select => {
                let Some(id) = self.assign_task_id.take() else {
                    self.view_mode = ViewMode::Dashboard;
                    return;
                };
                let Some(user) = self.assignable.get(self.selected_user) else {
                    self.view_mode = ViewMode::Dashboard;
                    return;
                };
                let account_id = user.account_id.clone();
                self.view_mode = ViewMode::Dashboard;
                self.send_task(&id, Some(&account_id)).await;
            }
            KeyAction::Escape => {
                self.assign_task_id = None;
                self.view_mode = ViewMode::Dashboard;
            }
            _ => {}
        }
    }

    async fn handle_capture_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Escape => {
                self.capture = None;
                self.view_mode = ViewMode::Dashboard;
                self.flash("Capture discarded");
                return;
            }
            KeyAction::Select => {
                self.submit_capture().await;
                return;
            }
            _ => {}
        }

        let Some(form) = self.capture.as_mut() else {
            self.view_mode = ViewMode::Dashboard;
            return;
        };
        match key {
            KeyAction::Tab | KeyAction::Down => form.field = form.field.next(),
            KeyAction::Up => form.field = form.field.prev(),
            KeyAction::Backspace => match form.field {
                CaptureField::Title => {
                    form.title_input.pop();
                }
                CaptureField::Deadline => {
                    form.deadline_input.pop();
                }
                CaptureField::Priority => {}
            },
            KeyAction::Left | KeyAction::Right => {
                if form.field == CaptureField::Priority {
                    form.draft.priority = form.draft.priority.cycle();
                }
            }
            KeyAction::Char(c) => match form.field {
                CaptureField::Title => form.title_input.push(c),
                CaptureField::Deadline => form.deadline_input.push(c),
                CaptureField::Priority => {
                    if c == ' ' {
                        form.draft.priority = form.draft.priority.cycle();
                    }
                }
            },
            _ => {}
        }
    }

    async fn submit_capture(&mut self) {
        let Some(form) = self.capture.as_ref() else {
            return;
        };
        let title_input = form.title_input.trim().to_string();
        let deadline_input = form.deadline_input.trim().to_string();
        let mut draft = form.draft.clone();

        let deadline = if deadline_input.is_empty() {
            None
        } else {
            match chrono::NaiveDate::parse_from_str(&deadline_input, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    self.set_capture_error("Deadline must be YYYY-MM-DD");
                    return;
                }
            }
        };

        // A new-task entry has no snippet; the typed title is the task.
        if draft.text.is_empty() {
            draft.text = title_input.clone();
        }
        if draft.text.is_empty() {
            self.set_capture_error("Nothing to capture");
            return;
        }
        draft.title = Some(title_input).filter(|t| !t.is_empty());
        draft.deadline = deadline;

        match self.lifecycle.submit_draft(&draft, "dashboard").await {
            Ok(task) => {
                self.capture = None;
                self.view_mode = ViewMode::Dashboard;
                if task.is_local() {
                    self.flash(format!("Captured locally: {}", task.title));
                } else {
                    self.flash(format!("Captured: {}", task.title));
                }
                self.refresh().await;
            }
            Err(err) => self.set_capture_error(format!("{err}")),
        }
    }

    fn set_capture_error(&mut self, msg: impl Into<String>) {
        if let Some(form) = self.capture.as_mut() {
            form.error = Some(msg.into());
        }
    }

    pub async fn refresh(&mut self) {
        self.loading = true;
        let tasks = self.lifecycle.refresh().await;
        let _ = self.action_tx.send(Action::TasksLoaded(tasks));
    }

    fn flash(&mut self, msg: impl Into<String>) {
        self.flash_message = Some((msg.into(), Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TaskCache;
    use crate::model::task::{NewTask, Priority};
    use crate::remote::RemoteStore;

    /// App wired to a store nothing listens on, so every remote call fails
    /// fast and the mirror carries the state.
    async fn offline_app() -> (App, mpsc::UnboundedReceiver<Action>, tempfile::TempDir) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = Lifecycle::with_parts(
            RemoteStore::new(format!("http://{addr}")),
            None,
            TaskCache::with_path(dir.path().join("tasks.json")),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(lifecycle, tx, None);
        (app, rx, dir)
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        let draft = Draft::new(&format!("task {id}"), None, None);
        let mut task = NewTask::from_draft(&draft, "test").into_task(id.to_string());
        task.status = status;
        task
    }

    fn filter_ids(tasks: &[Task], filter: StatusFilter) -> Vec<String> {
        tasks
            .iter()
            .filter(|t| filter.admits(t))
            .map(|t| t.id.clone())
            .collect()
    }

    #[test]
    fn all_filter_excludes_declined() {
        let tasks = vec![
            task("p", TaskStatus::Pending),
            task("s", TaskStatus::Sent),
            task("d", TaskStatus::Declined),
        ];
        assert_eq!(filter_ids(&tasks, StatusFilter::All), vec!["p", "s"]);
        assert_eq!(filter_ids(&tasks, StatusFilter::Declined), vec!["d"]);
        assert_eq!(filter_ids(&tasks, StatusFilter::Pending), vec!["p"]);
        assert_eq!(filter_ids(&tasks, StatusFilter::Sent), vec!["s"]);
    }

    #[test]
    fn filter_cycle_wraps() {
        let mut filter = StatusFilter::All;
        for _ in 0..4 {
            filter = filter.next();
        }
        assert_eq!(filter, StatusFilter::All);
    }

    #[test]
    fn capture_form_prefills_derived_title() {
        let long: String = "y".repeat(80);
        let form = CaptureForm::new(Draft::new(&long, None, None));
        assert_eq!(form.title_input.chars().count(), 53);
        assert!(form.title_input.ends_with("..."));
        assert_eq!(form.field, CaptureField::Title);
    }

    #[test]
    fn capture_form_for_new_task_starts_empty() {
        let form = CaptureForm::new(Draft::new("", None, None));
        assert!(form.title_input.is_empty());
        assert_eq!(form.draft.priority, Priority::Medium);
    }

    #[test]
    fn capture_field_cycle_is_closed() {
        let mut field = CaptureField::Title;
        for _ in 0..3 {
            field = field.next();
        }
        assert_eq!(field, CaptureField::Title);
        assert_eq!(CaptureField::Title.prev(), CaptureField::Deadline);
    }

    #[tokio::test]
    async fn redundant_awake_signal_is_a_no_op() {
        let (mut app, mut rx, _dir) = offline_app().await;
        assert!(app.waking.is_some());

        app.update(Action::BackendAwake).await;
        assert!(app.waking.is_none());
        assert!(app.flash_message.is_some());
        assert!(matches!(rx.recv().await, Some(Action::TasksLoaded(_))));

        // A second awake after the standby screen is gone changes nothing.
        app.flash_message = None;
        app.update(Action::BackendAwake).await;
        assert!(app.flash_message.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn declined_task_leaves_the_default_view() {
        let (mut app, _rx, _dir) = offline_app().await;
        let task = app
            .lifecycle
            .submit_draft(
                &Draft::new(
                    "Book flight by Friday",
                    Some("https://app.slack.com/client/T1/C2".into()),
                    None,
                ),
                "test",
            )
            .await
            .unwrap();

        let tasks = app.lifecycle.cache.get();
        app.update(Action::TasksLoaded(tasks)).await;
        assert_eq!(app.visible_tasks().len(), 1);

        app.lifecycle.decline_task(&task.id).await.unwrap();
        let tasks = app.lifecycle.cache.get();
        app.update(Action::TasksLoaded(tasks)).await;

        assert!(app.visible_tasks().is_empty());
        app.filter = StatusFilter::Declined;
        assert_eq!(app.visible_tasks().len(), 1);
    }
}
