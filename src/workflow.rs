//! Pin placement state machine.
//!
//! `Idle -> Armed -> (click) -> Reviewing -> Committed | Cancelled -> Idle`.
//! The click handling between `Armed` and `Reviewing` is the placing step; it
//! happens inside a single dispatch, so it never shows up as a resting state.
//! There is at most one candidate location, and it only exists while
//! `Reviewing`.

use crate::proposal::{IdGenerator, Proposal, ShadeType};
use crate::store::StoreError;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

/// Where the committed proposal goes: persistence, the proposals overlay and
/// the summary chart.
pub trait ProposalSink {
    /// Persist the proposal and add its permanent marker.
    /// On error nothing must have been added.
    fn commit(&mut self, proposal: &Proposal) -> Result<(), StoreError>;

    /// Recompute the summary counts
    fn refresh_summary(&mut self);
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("The {0} coordinate is missing. Click the map to place the pin again.")]
    MissingCoordinate(&'static str),

    #[error("The {0} coordinate {1:?} is not a valid number.")]
    InvalidCoordinate(&'static str, String),

    #[error("Please give the proposed site a name.")]
    MissingName,

    #[error("Could not save the proposal: {0}")]
    Store(#[from] StoreError),
}

/// Location of the pin being placed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WorkflowState {
    Idle,
    /// Waiting for the map click that places the pin
    Armed,
    /// Modal form open for the candidate
    Reviewing(Candidate),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WorkflowEvent {
    /// The "add shade" control was activated
    Arm,
    MapClick { lat: f64, lng: f64 },
    /// The candidate marker was dragged
    MoveCandidate { lat: f64, lng: f64 },
    /// Cancel button, modal close or Escape
    Cancel,
    Submit,
}

/// What a dispatch did, for the shell to reflect
#[derive(Debug)]
pub enum Effect {
    /// The event has no meaning in the current state
    Ignored,
    Armed,
    Disarmed,
    /// Candidate placed and the form opened
    Reviewing(Candidate),
    CandidateMoved(Candidate),
    Cancelled,
    /// Submission refused; still `Reviewing`
    Rejected(SubmitError),
    Committed(Proposal),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormField {
    #[default]
    Name,
    Type,
    Description,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Type,
            FormField::Type => FormField::Description,
            FormField::Description => FormField::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Name => FormField::Description,
            FormField::Type => FormField::Name,
            FormField::Description => FormField::Type,
        }
    }
}

/// Contents of the proposal form. `lat` and `lng` are read-only in the UI and
/// hold the candidate coordinates rounded to 6 decimals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProposalForm {
    pub name: String,
    pub kind: ShadeType,
    pub desc: String,
    pub lat: String,
    pub lng: String,
    pub focus: FormField,
}

impl ProposalForm {
    fn show_coordinates(&mut self, candidate: Candidate) {
        self.lat = format!("{:.6}", candidate.lat);
        self.lng = format!("{:.6}", candidate.lng);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Type a character into the focused text field
    pub fn insert_char(&mut self, c: char) {
        match self.focus {
            FormField::Name => self.name.push(c),
            FormField::Description => self.desc.push(c),
            FormField::Type if c == ' ' => self.kind = self.kind.next(),
            FormField::Type => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            FormField::Name => {
                self.name.pop();
            }
            FormField::Description => {
                self.desc.pop();
            }
            FormField::Type => {}
        }
    }

    pub fn cycle_type(&mut self, forward: bool) {
        self.kind = if forward { self.kind.next() } else { self.kind.prev() };
    }

    fn coordinate(field: &'static str, text: &str) -> Result<f64, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::MissingCoordinate(field));
        }
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(SubmitError::InvalidCoordinate(field, text.to_string())),
        }
    }

    /// Validated (lat, lng) from the coordinate fields
    pub fn coordinates(&self) -> Result<(f64, f64), SubmitError> {
        Ok((
            Self::coordinate("latitude", &self.lat)?,
            Self::coordinate("longitude", &self.lng)?,
        ))
    }
}

/// The add-shade workflow: state, form and id source
#[derive(Debug)]
pub struct ProposalWorkflow {
    state: WorkflowState,
    form: ProposalForm,
    ids: IdGenerator,
}

impl ProposalWorkflow {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            state: WorkflowState::Idle,
            form: ProposalForm::default(),
            ids,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Whether the add-shade control shows as armed
    pub fn is_armed(&self) -> bool {
        !matches!(self.state, WorkflowState::Idle)
    }

    pub fn is_reviewing(&self) -> bool {
        matches!(self.state, WorkflowState::Reviewing(_))
    }

    pub fn candidate(&self) -> Option<Candidate> {
        match self.state {
            WorkflowState::Reviewing(c) => Some(c),
            _ => None,
        }
    }

    pub fn form(&self) -> &ProposalForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProposalForm {
        &mut self.form
    }

    pub fn dispatch(&mut self, event: WorkflowEvent, sink: &mut dyn ProposalSink) -> Effect {
        use WorkflowEvent as E;
        use WorkflowState as S;

        let effect = match (self.state, event) {
            (S::Idle, E::Arm) => {
                self.state = S::Armed;
                Effect::Armed
            }
            (S::Armed, E::Cancel) => {
                self.state = S::Idle;
                Effect::Disarmed
            }
            (S::Armed, E::MapClick { lat, lng }) => {
                let candidate = Candidate { lat, lng };
                self.state = S::Reviewing(candidate);
                self.form.show_coordinates(candidate);
                self.form.focus = FormField::Name;
                Effect::Reviewing(candidate)
            }
            (S::Reviewing(_), E::MoveCandidate { lat, lng }) => {
                let candidate = Candidate { lat, lng };
                self.state = S::Reviewing(candidate);
                self.form.show_coordinates(candidate);
                Effect::CandidateMoved(candidate)
            }
            (S::Reviewing(_), E::Cancel) => {
                self.state = S::Idle;
                Effect::Cancelled
            }
            (S::Reviewing(_), E::Submit) => self.submit(sink),
            _ => Effect::Ignored,
        };

        debug!(?event, state = ?self.state, "workflow dispatch");
        effect
    }

    fn submit(&mut self, sink: &mut dyn ProposalSink) -> Effect {
        let proposal = match self.build_proposal() {
            Ok(p) => p,
            Err(e) => return Effect::Rejected(e),
        };

        if let Err(e) = sink.commit(&proposal) {
            return Effect::Rejected(e.into());
        }

        info!(id = %proposal.id, lat = proposal.lat, lng = proposal.lng, "proposal committed");
        self.form.clear();
        self.state = WorkflowState::Idle;
        sink.refresh_summary();
        Effect::Committed(proposal)
    }

    fn build_proposal(&mut self) -> Result<Proposal, SubmitError> {
        let (lat, lng) = self.form.coordinates()?;
        let name = self.form.name.trim();
        if name.is_empty() {
            return Err(SubmitError::MissingName);
        }
        let now = Utc::now();
        Ok(Proposal {
            id: self.ids.next_id(now),
            name: name.to_string(),
            kind: self.form.kind,
            desc: self.form.desc.clone(),
            lat,
            lng,
            created: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ProposalStore};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        store: Option<ProposalStore<MemoryStore>>,
        committed: Vec<Proposal>,
        refreshes: usize,
        fail: bool,
    }

    impl ProposalSink for Recorder {
        fn commit(&mut self, proposal: &Proposal) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::InvalidKey("broken".into()));
            }
            self.store
                .get_or_insert_with(|| ProposalStore::new(MemoryStore::default()))
                .add(proposal.clone())?;
            self.committed.push(proposal.clone());
            Ok(())
        }

        fn refresh_summary(&mut self) {
            self.refreshes += 1;
        }
    }

    fn reviewing_at(lat: f64, lng: f64) -> (ProposalWorkflow, Recorder) {
        let mut wf = ProposalWorkflow::new(IdGenerator::default());
        let mut sink = Recorder::default();
        assert!(matches!(wf.dispatch(WorkflowEvent::Arm, &mut sink), Effect::Armed));
        let effect = wf.dispatch(WorkflowEvent::MapClick { lat, lng }, &mut sink);
        assert!(matches!(effect, Effect::Reviewing(_)));
        (wf, sink)
    }

    #[test]
    fn test_click_while_idle_is_ignored() {
        let mut wf = ProposalWorkflow::new(IdGenerator::default());
        let mut sink = Recorder::default();
        let effect = wf.dispatch(WorkflowEvent::MapClick { lat: 1.0, lng: 2.0 }, &mut sink);
        assert!(matches!(effect, Effect::Ignored));
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert!(!wf.is_armed());
    }

    #[test]
    fn test_armed_click_opens_form_with_rounded_coordinates() {
        let (wf, _) = reviewing_at(32.123_456_789, -110.987_654_321);
        assert!(wf.is_reviewing());
        assert!(wf.is_armed());
        assert_eq!(wf.form().lat, "32.123457");
        assert_eq!(wf.form().lng, "-110.987654");
        assert_eq!(wf.form().focus, FormField::Name);
        assert_eq!(
            wf.candidate(),
            Some(Candidate {
                lat: 32.123_456_789,
                lng: -110.987_654_321
            })
        );
    }

    #[test]
    fn test_escape_cancels_without_store_mutation() {
        let (mut wf, mut sink) = reviewing_at(32.23, -110.95);
        wf.form_mut().name = "Half typed".into();
        assert!(matches!(wf.dispatch(WorkflowEvent::Cancel, &mut sink), Effect::Cancelled));
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert_eq!(wf.candidate(), None);
        assert!(sink.store.is_none());
        assert_eq!(sink.refreshes, 0);
    }

    #[test]
    fn test_cancel_while_armed_disarms() {
        let mut wf = ProposalWorkflow::new(IdGenerator::default());
        let mut sink = Recorder::default();
        wf.dispatch(WorkflowEvent::Arm, &mut sink);
        assert!(matches!(wf.dispatch(WorkflowEvent::Cancel, &mut sink), Effect::Disarmed));
        assert!(!wf.is_armed());
    }

    #[test]
    fn test_submit_commits_example_proposal() {
        let (mut wf, mut sink) = reviewing_at(32.2300, -110.9500);
        let form = wf.form_mut();
        form.name = "Shade Oak".into();
        form.kind = ShadeType::Tree;
        form.desc = "test".into();

        let Effect::Committed(proposal) = wf.dispatch(WorkflowEvent::Submit, &mut sink) else {
            panic!("expected commit");
        };
        assert_eq!(proposal.lat, 32.23);
        assert_eq!(proposal.lng, -110.95);
        assert_eq!(proposal.name, "Shade Oak");
        assert_eq!(proposal.kind, ShadeType::Tree);
        assert_eq!(proposal.desc, "test");

        let stored = sink.store.as_ref().unwrap().list();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], proposal);
        assert_eq!(sink.refreshes, 1);
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert_eq!(wf.form(), &ProposalForm::default());
    }

    #[test]
    fn test_missing_or_bad_coordinates_are_rejected() {
        for (lat, lng) in [("", "-110.95"), ("32.23", "  "), ("NaN", "1"), ("1", "inf"), ("north", "1")] {
            let (mut wf, mut sink) = reviewing_at(32.23, -110.95);
            wf.form_mut().name = "Site".into();
            wf.form_mut().lat = lat.into();
            wf.form_mut().lng = lng.into();

            let effect = wf.dispatch(WorkflowEvent::Submit, &mut sink);
            assert!(matches!(effect, Effect::Rejected(_)), "{lat:?} {lng:?}");
            assert!(wf.is_reviewing());
            assert!(sink.committed.is_empty());
        }
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let (mut wf, mut sink) = reviewing_at(32.23, -110.95);
        wf.form_mut().name = "   ".into();
        let effect = wf.dispatch(WorkflowEvent::Submit, &mut sink);
        assert!(matches!(effect, Effect::Rejected(SubmitError::MissingName)));
        assert!(wf.is_reviewing());
    }

    #[test]
    fn test_store_failure_keeps_reviewing() {
        let (mut wf, mut sink) = reviewing_at(32.23, -110.95);
        sink.fail = true;
        wf.form_mut().name = "Site".into();
        let effect = wf.dispatch(WorkflowEvent::Submit, &mut sink);
        assert!(matches!(effect, Effect::Rejected(SubmitError::Store(_))));
        assert!(wf.is_reviewing());
        assert_eq!(wf.form().name, "Site");
        assert_eq!(sink.refreshes, 0);
    }

    #[test]
    fn test_dragging_candidate_updates_form() {
        let (mut wf, mut sink) = reviewing_at(32.23, -110.95);
        let effect = wf.dispatch(WorkflowEvent::MoveCandidate { lat: 32.24, lng: -110.96 }, &mut sink);
        assert!(matches!(effect, Effect::CandidateMoved(_)));
        assert_eq!(wf.form().lat, "32.240000");
        assert_eq!(wf.form().lng, "-110.960000");
    }

    #[test]
    fn test_rearming_while_reviewing_is_ignored() {
        let (mut wf, mut sink) = reviewing_at(32.23, -110.95);
        assert!(matches!(wf.dispatch(WorkflowEvent::Arm, &mut sink), Effect::Ignored));
        let click = WorkflowEvent::MapClick { lat: 0.0, lng: 0.0 };
        assert!(matches!(wf.dispatch(click, &mut sink), Effect::Ignored));
        assert_eq!(wf.candidate().map(|c| c.lat), Some(32.23));
    }

    #[test]
    fn test_form_editing() {
        let mut form = ProposalForm::default();
        for c in "Oak".chars() {
            form.insert_char(c);
        }
        form.backspace();
        form.focus_next();
        form.cycle_type(true);
        form.focus_next();
        form.insert_char('x');
        form.focus_prev();
        form.focus_prev();
        assert_eq!(form.name, "Oa");
        assert_eq!(form.kind, ShadeType::Structure);
        assert_eq!(form.desc, "x");
        assert_eq!(form.focus, FormField::Name);
    }
}
