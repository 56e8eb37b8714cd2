//! Inspector session: the single owner of all mutable view state.
//!
//! Filters and selection are changed synchronously; the only suspension
//! points are backend calls, and every one of them goes through a
//! [`RequestSlot`] so a late response can never overwrite a newer one.

use crate::attention::AttentionReplay;
use crate::logprobs::{normalize, NormalizedTokenLogprob};
use crate::model::EvalRecord;
use crate::providers::{DatasetSource, EvalBackend, QueryRequest};
use crate::reference::ReferenceKind;
use crate::results::QueryOutcome;
use crate::slot::{RequestSlot, SlotState, Ticket};
use crate::working_set::{build_working_set, FilterInputs, WorkingSet};
use anyhow::{anyhow, Context};
use tracing::{debug, info};

/// The three query runs a selected record supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Golden,
    Generated,
    PostgresGolden,
}

#[derive(Debug)]
pub struct InspectorSession {
    dataset_id: Option<String>,
    records: Vec<EvalRecord>,
    filters: FilterInputs,
    working_set: WorkingSet,
    replay: AttentionReplay,
    dataset: RequestSlot<usize>,
    attention: RequestSlot<usize>,
    golden: RequestSlot<QueryOutcome>,
    generated: RequestSlot<QueryOutcome>,
    postgres_golden: RequestSlot<QueryOutcome>,
}

impl Default for InspectorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorSession {
    pub fn new() -> Self {
        Self {
            dataset_id: None,
            records: Vec::new(),
            filters: FilterInputs::default(),
            working_set: WorkingSet::default(),
            replay: AttentionReplay::default(),
            dataset: RequestSlot::new("dataset"),
            attention: RequestSlot::new("attention"),
            golden: RequestSlot::new("golden"),
            generated: RequestSlot::new("generated"),
            postgres_golden: RequestSlot::new("postgres_golden"),
        }
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_deref()
    }

    pub fn records(&self) -> &[EvalRecord] {
        &self.records
    }

    pub fn filters(&self) -> &FilterInputs {
        &self.filters
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn selected(&self) -> Option<&EvalRecord> {
        self.working_set.selected.as_ref()
    }

    pub fn replay(&self) -> &AttentionReplay {
        &self.replay
    }

    pub fn replay_mut(&mut self) -> &mut AttentionReplay {
        &mut self.replay
    }

    pub fn dataset_state(&self) -> &SlotState<usize> {
        self.dataset.state()
    }

    pub fn attention_state(&self) -> &SlotState<usize> {
        self.attention.state()
    }

    pub fn query_state(&self, kind: QueryKind) -> &SlotState<QueryOutcome> {
        match kind {
            QueryKind::Golden => self.golden.state(),
            QueryKind::Generated => self.generated.state(),
            QueryKind::PostgresGolden => self.postgres_golden.state(),
        }
    }

    fn query_slot(&mut self, kind: QueryKind) -> &mut RequestSlot<QueryOutcome> {
        match kind {
            QueryKind::Golden => &mut self.golden,
            QueryKind::Generated => &mut self.generated,
            QueryKind::PostgresGolden => &mut self.postgres_golden,
        }
    }

    // --- dataset ---

    pub fn begin_dataset_load(&mut self) -> Ticket {
        self.dataset.begin()
    }

    /// Installs the records if `ticket` is still current and returns whether
    /// it did. A failed load keeps whatever dataset was loaded before.
    pub fn finish_dataset_load<E: std::fmt::Display>(
        &mut self,
        ticket: Ticket,
        id: &str,
        result: Result<Vec<EvalRecord>, E>,
    ) -> bool {
        let records = match result {
            Ok(records) => records,
            Err(e) => {
                self.dataset.complete::<E>(ticket, Err(e));
                return false;
            }
        };
        let count = records.len();
        if !self.dataset.complete::<E>(ticket, Ok(count)) {
            return false;
        }
        info!(dataset = id, records = count, "dataset loaded");
        self.install_dataset(id, records);
        true
    }

    /// Replaces the dataset without going through the backend (`--file`).
    pub fn install_dataset(&mut self, id: &str, records: Vec<EvalRecord>) {
        self.dataset_id = Some(id.to_string());
        self.records = records;
        self.working_set.selected = None;
        self.reset_record_views();
        self.rebuild();
    }

    pub async fn load_dataset(&mut self, backend: &dyn EvalBackend, id: &str) -> bool {
        let ticket = self.begin_dataset_load();
        let result: anyhow::Result<Vec<EvalRecord>> = async {
            let manifest = backend
                .fetch_manifest()
                .await
                .context("failed to fetch manifest")?;
            let source = DatasetSource::resolve(id, &manifest);
            debug!(dataset = id, ?source, "resolved dataset source");
            backend.fetch_dataset(id, source).await
        }
        .await;
        self.finish_dataset_load(ticket, id, result.map_err(|e| format!("{e:#}")))
    }

    // --- filters ---

    pub fn set_search(&mut self, pattern: Option<String>) {
        self.filters.search = pattern;
        self.rebuild();
    }

    pub fn set_max_confidence(&mut self, threshold: Option<f64>) {
        self.filters.max_confidence = threshold;
        self.rebuild();
    }

    /// Recomputes the working set and swaps it in. The selection survives
    /// when its record is still part of the new set.
    fn rebuild(&mut self) {
        let mut next = build_working_set(
            &self.records,
            self.filters.search.as_deref(),
            self.filters.max_confidence,
        );
        let kept = self
            .working_set
            .selected
            .as_ref()
            .and_then(|sel| next.find(&sel.db_name, &sel.question).cloned());
        if kept.is_none() && self.working_set.selected.is_some() {
            self.reset_record_views();
        }
        next.selected = kept;
        self.working_set = next;
    }

    // --- selection ---

    /// Selects a record of the working set. Returns `false` when not found.
    pub fn select(&mut self, db_name: &str, question: &str) -> bool {
        let Some(record) = self.working_set.find(db_name, question).cloned() else {
            return false;
        };
        let changed = self.selected().map(EvalRecord::key) != Some(record.key());
        if changed {
            self.reset_record_views();
        }
        self.working_set.selected = Some(record);
        true
    }

    pub fn clear_selection(&mut self) {
        self.working_set.selected = None;
        self.reset_record_views();
    }

    fn reset_record_views(&mut self) {
        self.golden.reset();
        self.generated.reset();
        self.postgres_golden.reset();
        self.attention.reset();
        self.replay.clear();
    }

    /// Normalized token trace of the selected record.
    pub fn token_trace(&self) -> Vec<NormalizedTokenLogprob> {
        self.selected()
            .map(|r| normalize(r.trace()))
            .unwrap_or_default()
    }

    // --- queries ---

    /// Issues a ticket for a gold or generated run of the selected record.
    /// The postgres cross-check needs the reference file and goes through
    /// [`Self::run_postgres_golden`].
    pub fn begin_query(&mut self, kind: QueryKind) -> Option<(Ticket, QueryRequest)> {
        let request = match kind {
            QueryKind::Golden => QueryRequest::gold(self.selected()?),
            QueryKind::Generated => QueryRequest::generated(self.selected()?),
            QueryKind::PostgresGolden => return None,
        };
        Some((self.query_slot(kind).begin(), request))
    }

    pub fn finish_query<E: std::fmt::Display>(
        &mut self,
        kind: QueryKind,
        ticket: Ticket,
        result: Result<QueryOutcome, E>,
    ) -> bool {
        self.query_slot(kind).complete(ticket, result)
    }

    pub async fn run_query(
        &mut self,
        backend: &dyn EvalBackend,
        kind: QueryKind,
    ) -> &SlotState<QueryOutcome> {
        if kind == QueryKind::PostgresGolden {
            return self.run_postgres_golden(backend).await;
        }
        let Some((ticket, request)) = self.begin_query(kind) else {
            return self.query_state(kind);
        };
        let result = backend
            .run_query(&request)
            .await
            .map_err(|e| format!("{e:#}"));
        self.finish_query(kind, ticket, result);
        self.query_state(kind)
    }

    /// Runs the gold query from the matching reference file against postgres.
    pub async fn run_postgres_golden(
        &mut self,
        backend: &dyn EvalBackend,
    ) -> &SlotState<QueryOutcome> {
        if self.selected().is_none() {
            return self.postgres_golden.state();
        }
        let ticket = self.postgres_golden.begin();
        let result = self
            .postgres_golden_outcome(backend)
            .await
            .map_err(|e| format!("{e:#}"));
        self.postgres_golden.complete(ticket, result);
        self.postgres_golden.state()
    }

    async fn postgres_golden_outcome(
        &self,
        backend: &dyn EvalBackend,
    ) -> anyhow::Result<QueryOutcome> {
        let record = self
            .selected()
            .ok_or_else(|| anyhow!("no record selected"))?;
        let kind = ReferenceKind::for_dataset(self.dataset_id().unwrap_or_default())?;
        let reference = backend.fetch_reference(kind).await?;
        let gold = reference.gold_query(&record.question, &record.db_name)?;
        let request = QueryRequest::new(gold, "postgres", &record.db_name);
        backend.run_query(&request).await
    }

    // --- attention ---

    pub fn begin_attention(&mut self) -> Ticket {
        self.replay.set_loading();
        self.attention.begin()
    }

    pub fn finish_attention<E: std::fmt::Display>(
        &mut self,
        ticket: Ticket,
        result: Result<Option<crate::attention::AttentionTrace>, E>,
    ) -> bool {
        if !self.attention.is_current(ticket) {
            return self.attention.complete(ticket, result.map(|_| 0));
        }
        match result {
            Ok(Some(trace)) => {
                let steps = trace.len();
                self.replay.load(trace);
                self.attention.complete::<E>(ticket, Ok(steps))
            }
            Ok(None) => {
                self.replay.clear();
                self.attention
                    .complete(ticket, Err("attention service returned no data"))
            }
            Err(e) => {
                self.replay.clear();
                self.attention.complete::<E>(ticket, Err(e))
            }
        }
    }

    /// Requests attention for the selected record's prompt. Records without a
    /// prompt leave the replay in its no-trace state.
    pub async fn load_attention(&mut self, backend: &dyn EvalBackend, model_name: &str) -> bool {
        let Some(prompt) = self.selected().and_then(|r| r.prompt.clone()) else {
            self.replay.clear();
            return false;
        };
        let ticket = self.begin_attention();
        let result = backend
            .fetch_attention(&prompt, model_name)
            .await
            .map_err(|e| format!("{e:#}"));
        self.finish_attention(ticket, result) && self.replay.has_trace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attention::{AttentionEntry, AttentionTrace, ReplayState};
    use crate::providers::fake::FakeBackend;
    use crate::reference::{ReferenceEntry, ReferenceSet};
    use crate::results::QueryOutcome;
    use serde_json::json;

    fn rec(db: &str, q: &str, correct: u8, cat: &str) -> EvalRecord {
        serde_json::from_value(json!({
            "question": q,
            "db_name": db,
            "db_type": "Postgres",
            "query": format!("SELECT {{col}} FROM {db}"),
            "generated_query": format!("SELECT x FROM {db}"),
            "correct": correct,
            "error_db_exec": 0,
            "query_category": cat,
            "prompt": format!("### {q}"),
        }))
        .unwrap()
    }

    fn session_with(records: Vec<EvalRecord>) -> InspectorSession {
        let mut s = InspectorSession::new();
        s.install_dataset("basic_new", records);
        s
    }

    #[test]
    fn selection_survives_rebuild_when_still_present() {
        let mut s = session_with(vec![
            rec("a", "count users", 1, "x"),
            rec("b", "list orders", 0, "y"),
        ]);
        assert!(s.select("a", "count users"));

        s.set_search(Some("USERS".into()));
        assert_eq!(s.selected().map(|r| r.question.as_str()), Some("count users"));

        s.set_search(Some("orders".into()));
        assert!(s.selected().is_none());
        assert_eq!(s.working_set().categories, vec!["y"]);
    }

    #[test]
    fn selecting_unknown_record_fails() {
        let mut s = session_with(vec![rec("a", "q", 1, "x")]);
        assert!(!s.select("a", "other"));
        assert!(s.selected().is_none());
    }

    #[tokio::test]
    async fn query_slots_are_independent() {
        let backend = FakeBackend::new().with_outcome(
            "SELECT col FROM a",
            QueryOutcome::Rows(vec![json!({"n": 1}).as_object().unwrap().clone()]),
        );
        let mut s = session_with(vec![rec("a", "q", 1, "x")]);
        s.select("a", "q");

        let golden = s.run_query(&backend, QueryKind::Golden).await.clone();
        assert!(matches!(golden, SlotState::Ready(QueryOutcome::Rows(ref r)) if r.len() == 1));
        assert_eq!(s.query_state(QueryKind::Generated), &SlotState::Idle);

        let sent = backend.queries();
        assert_eq!(sent[0].query, "SELECT col FROM a");
        assert_eq!(sent[0].db_type, "postgres");
    }

    #[tokio::test]
    async fn failed_run_is_slot_scoped() {
        let backend = FakeBackend::new().failing_queries();
        let mut s = session_with(vec![rec("a", "q", 1, "x")]);
        s.select("a", "q");

        s.run_query(&backend, QueryKind::Generated).await;
        assert_eq!(
            s.query_state(QueryKind::Generated).error(),
            Some("connection refused")
        );
        assert_eq!(s.query_state(QueryKind::Golden), &SlotState::Idle);
    }

    #[test]
    fn late_response_for_previous_record_is_dropped() {
        let mut s = session_with(vec![rec("a", "q1", 1, "x"), rec("a", "q2", 1, "x")]);
        s.select("a", "q1");
        let (old, _) = s.begin_query(QueryKind::Golden).unwrap();
        s.select("a", "q2");
        let (new, _) = s.begin_query(QueryKind::Golden).unwrap();

        assert!(s.finish_query::<String>(QueryKind::Golden, new, Ok(QueryOutcome::Rows(vec![]))));
        assert!(!s.finish_query(
            QueryKind::Golden,
            old,
            Ok::<_, String>(QueryOutcome::Error { error: "stale".into() })
        ));
        assert_eq!(
            s.query_state(QueryKind::Golden),
            &SlotState::Ready(QueryOutcome::Rows(vec![]))
        );
    }

    #[tokio::test]
    async fn postgres_golden_uses_reference_file() {
        let backend = FakeBackend::new().with_reference(ReferenceSet::new(
            ReferenceKind::Basic,
            vec![ReferenceEntry {
                question: "q".into(),
                query: "SELECT {n} FROM t".into(),
                db_name: None,
            }],
        ));
        let mut s = session_with(vec![rec("a", "q", 1, "x")]);
        s.select("a", "q");

        s.run_query(&backend, QueryKind::PostgresGolden).await;
        assert!(s.query_state(QueryKind::PostgresGolden).ready().is_some());
        let sent = backend.queries();
        assert_eq!(sent[0].query, "SELECT n FROM t");
        assert_eq!(sent[0].db_type, "postgres");
        assert_eq!(sent[0].db_name, "a");
    }

    #[tokio::test]
    async fn postgres_golden_without_reference_reports_error() {
        let backend = FakeBackend::new();
        let mut s = InspectorSession::new();
        s.install_dataset("instruct_run", vec![rec("a", "q", 1, "x")]);
        s.select("a", "q");

        let state = s.run_query(&backend, QueryKind::PostgresGolden).await;
        assert!(state.error().unwrap().contains("no golden reference file"));
    }

    #[tokio::test]
    async fn attention_load_and_failure_states() {
        let trace = AttentionTrace::new(vec![
            vec![AttentionEntry { token: "Q".into(), attn_weight: 1.0 }],
            vec![
                AttentionEntry { token: "Q".into(), attn_weight: 0.5 },
                AttentionEntry { token: "SELECT".into(), attn_weight: 1.5 },
            ],
        ]);
        let backend = FakeBackend::new().with_attention(trace);
        let mut s = session_with(vec![rec("a", "q", 1, "x")]);
        s.select("a", "q");

        assert!(s.load_attention(&backend, "m").await);
        assert_eq!(s.replay().step_count(), 2);
        s.replay_mut().set_step(1);
        assert_eq!(s.replay().current_token(), Some("SELECT"));

        let empty = FakeBackend::new();
        assert!(!s.load_attention(&empty, "m").await);
        assert_eq!(s.replay().state(), &ReplayState::NoTrace);
        assert!(s.attention_state().error().is_some());
    }

    #[test]
    fn superseded_attention_response_leaves_replay_loading() {
        let mut s = session_with(vec![rec("a", "q", 1, "x")]);
        s.select("a", "q");

        let old = s.begin_attention();
        let latest = s.begin_attention();
        let trace = AttentionTrace::new(vec![vec![AttentionEntry {
            token: "a".into(),
            attn_weight: 1.0,
        }]]);
        assert!(!s.finish_attention::<String>(old, Ok(Some(trace))));
        assert_eq!(s.replay().state(), &ReplayState::Loading);
        assert!(s.attention_state().is_pending());

        assert!(s.finish_attention::<String>(latest, Ok(None)));
        assert_eq!(s.replay().state(), &ReplayState::NoTrace);
    }

    #[tokio::test]
    async fn dataset_load_resolves_and_rebuilds() {
        let backend = FakeBackend::new()
            .with_manifest(&["basic_new.json"])
            .with_dataset("basic_new", vec![rec("b", "q2", 0, "y"), rec("a", "q1", 1, "x")]);
        let mut s = InspectorSession::new();

        assert!(s.load_dataset(&backend, "basic_new").await);
        assert_eq!(s.dataset_state(), &SlotState::Ready(2));
        assert_eq!(s.working_set().categories, vec!["x", "y"]);

        assert!(!s.load_dataset(&backend, "missing").await);
        assert!(s.dataset_state().error().unwrap().contains("missing"));
        assert_eq!(s.records().len(), 2);
    }
}
