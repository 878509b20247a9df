use crate::check::{derive_status, run_check, CheckRun, ResultsStore, SpecOutcome};
use crate::fix::{apply_suggestion, local_status, rule_based_recommendations, validation_context};
use crate::highlight::{self, HighlightStyle};
use crate::ids::SpecificationStore;
use crate::model::{CheckContext, Element, IssueLog, Status};
use crate::parser::LoadedModel;
use crate::reconcile::StatusReconciler;
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{DefaultTerminal, Frame};
use std::time::Duration;

/// How long to wait for input before redrawing, so reconciled statuses show
/// up without a key press.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusPanel {
    Specifications,
    Elements,
}

/// One line of the specification panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRow {
    pub name: String,
    pub passed: usize,
    pub failed: usize,
    /// Reason the specification was left out of the last run.
    pub skipped: Option<String>,
}

pub struct App {
    pub model: LoadedModel,
    pub store: SpecificationStore,
    pub results: ResultsStore,
    pub run: CheckRun,
    /// Element projections in model order, with their current status.
    pub elements: Vec<Element>,
    pub reconciler: StatusReconciler,
    pub issues: IssueLog,
    pub focus_panel: FocusPanel,
    pub selected_spec: usize,
    pub selected_element: usize,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    /// Builds the app and runs the first check.
    ///
    /// Must be called from within a tokio runtime; selecting an element
    /// spawns the reconciler task.
    #[must_use]
    pub fn new(
        model: LoadedModel,
        store: SpecificationStore,
        results: ResultsStore,
        reconcile_interval: Duration,
    ) -> Self {
        let reconciler = StatusReconciler::new(results.clone(), reconcile_interval);
        let mut app = Self {
            model,
            store,
            results,
            run: CheckRun::default(),
            elements: Vec::new(),
            reconciler,
            issues: IssueLog::new(),
            focus_panel: FocusPanel::Elements,
            selected_spec: 0,
            selected_element: 0,
            message: None,
            should_quit: false,
        };
        app.rerun_check();
        app
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        self.reconciler.deselect();
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        super::dashboard::draw_dashboard(frame, self);
    }

    fn handle_events(&mut self) -> Result<()> {
        if !event::poll(POLL_INTERVAL)? {
            return Ok(());
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                return Ok(());
            }
            self.handle_key(key.code);
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.navigate_down(),
            KeyCode::Left | KeyCode::Char('h') => self.focus_panel = FocusPanel::Specifications,
            KeyCode::Right | KeyCode::Char('l') => self.focus_panel = FocusPanel::Elements,
            KeyCode::Enter => self.select_current(),
            KeyCode::Esc => self.deselect(),
            KeyCode::Char('r') => self.rerun_check(),
            KeyCode::Char('s') => self.apply_first_suggestion(),
            KeyCode::Char('i') => self.file_issue(),
            _ => {}
        }
    }

    fn navigate_up(&mut self) {
        match self.focus_panel {
            FocusPanel::Specifications => {
                self.selected_spec = self.selected_spec.saturating_sub(1);
            }
            FocusPanel::Elements => {
                self.selected_element = self.selected_element.saturating_sub(1);
            }
        }
    }

    fn navigate_down(&mut self) {
        match self.focus_panel {
            FocusPanel::Specifications => {
                if self.selected_spec < self.store.specs().len().saturating_sub(1) {
                    self.selected_spec += 1;
                }
            }
            FocusPanel::Elements => {
                if self.selected_element < self.elements.len().saturating_sub(1) {
                    self.selected_element += 1;
                }
            }
        }
    }

    /// Evaluates every specification, publishes the results and repaints
    /// the model highlights. Local edits to the element list are discarded.
    pub fn rerun_check(&mut self) {
        let ctx = CheckContext::new(&self.model, &self.model);
        let run = run_check(self.store.specs(), ctx);
        let results = self.results.publish(run.results.clone());

        let pass = highlight::disjoint_pass_set(&results.all_pass, &results.all_fail);
        self.model.clear_styles();
        highlight::apply(&mut self.model, &pass, &results.all_fail);

        self.elements = self
            .model
            .elements()
            .filter_map(|e| self.model.project_element(&e.guid))
            .map(|element| {
                let status = derive_status(&element.guid, Some(&*results));
                element.with_status(status)
            })
            .collect();
        if self.selected_element >= self.elements.len() {
            self.selected_element = self.elements.len().saturating_sub(1);
        }

        self.message = Some(format!(
            "Checked {} specifications: {} failed, {} skipped",
            results.summary.total_specs,
            results.summary.failed_specs,
            run.skipped.len()
        ));
        self.run = run;
    }

    fn select_current(&mut self) {
        if let Some(element) = self.elements.get(self.selected_element).cloned() {
            let element = self.reconciler.select(element);
            self.message = Some(format!("Selected {} ({})", element.id, element.status));
        }
    }

    fn deselect(&mut self) {
        if self.reconciler.selected().is_some() {
            self.reconciler.deselect();
            self.message = None;
        }
    }

    /// Applies the first rule-based suggestion to the element under the
    /// cursor.
    pub fn apply_first_suggestion(&mut self) {
        let Some(element) = self.elements.get(self.selected_element) else {
            return;
        };
        let recommendation = rule_based_recommendations(element);
        let Some((property, value)) = recommendation.first_option() else {
            self.message = Some(format!("No suggestion for {}", element.id));
            return;
        };

        let id = element.id.clone();
        let message = format!("Set {property} = {value} on {id}");
        self.elements = apply_suggestion(&self.elements, &id, property, value);

        let selected_id = self.reconciler.selected().map(|e| e.id);
        if selected_id.as_deref() == Some(id.as_str()) {
            if let Some(updated) = self.elements.iter().find(|e| e.id == id).cloned() {
                self.reconciler.select(updated);
            }
        }
        self.message = Some(message);
    }

    /// Files an issue against the selected element.
    pub fn file_issue(&mut self) {
        let selected = self.reconciler.selected();
        let title = selected
            .as_ref()
            .map(|e| format!("{} {} is {}", e.element_type, e.id, e.status))
            .unwrap_or_default();
        let description = selected
            .as_ref()
            .map(|e| validation_context(e, self.results.latest().as_deref()))
            .unwrap_or_default();

        self.message = Some(
            match self
                .issues
                .create(selected.as_ref().map(|e| e.id.as_str()), &title, &description)
            {
                Some(issue) => format!("Created {}", issue.id),
                None => "Select an element (Enter) before filing an issue".to_string(),
            },
        );
    }

    /// One row per loaded specification, matched to the last run by
    /// position so specifications sharing a name keep their own counts.
    #[must_use]
    pub fn spec_rows(&self) -> Vec<SpecRow> {
        self.store
            .specs()
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let (passed, failed, skipped) = match self.run.outcomes.get(i) {
                    Some(SpecOutcome::Evaluated { passed, failed }) => (*passed, *failed, None),
                    Some(SpecOutcome::Skipped { reason }) => (0, 0, Some(reason.clone())),
                    None => (0, 0, None),
                };
                SpecRow {
                    name: spec.name.clone(),
                    passed,
                    failed,
                    skipped,
                }
            })
            .collect()
    }

    #[must_use]
    pub fn style_of(&self, element: &Element) -> Option<HighlightStyle> {
        self.model.style_of(&element.guid)
    }

    /// Selected element as kept up to date by the reconciler.
    #[must_use]
    pub fn selected_detail(&self) -> Option<Element> {
        self.reconciler.selected()
    }

    /// Status from the offline per-type rules, shown next to the IDS status.
    #[must_use]
    pub fn local_check(element: &Element) -> Status {
        local_status(element)
    }
}
