//! Remote-backed templates.
//!
//! A host with a data source loads its rows through the network
//! collaborator and feeds the response into [`duplicate_with_data`].
//!
//! # Request Discipline
//!
//! - same query as the last completed load: no request, `on_finish` runs now
//! - same query as the request in flight: no request, callbacks join it
//! - anything else: the host's generation is bumped and a request issued;
//!   a response whose generation is no longer current is dropped
//!
//! The loading indicator is shown when a request goes out and hidden once
//! no request is outstanding.

use serde_json::Value;
use tracing::{debug, warn};

use super::duplicate::{duplicate_with_data, normalize_rows, DuplicateOptions};
use crate::context::{Continuation, Engine, FailureContinuation};
use crate::engine::overlay;
use crate::error::{EngineError, Result};
use crate::services::{Request, Transition, TransitionKind};
use crate::types::{Attrs, NodeId, Ticket};

/// Options of [`load`].
#[derive(Default)]
pub struct LoadOptions {
    /// Replace existing duplicates instead of appending.
    pub reset: bool,
    /// Query to send instead of the source's own.
    pub query: Option<Value>,
    /// Single-row mode: the response's first row is merged over this seed,
    /// and an empty response yields the seed itself.
    pub seed: Option<Attrs>,
    pub on_finish: Option<Continuation>,
    pub on_failure: Option<FailureContinuation>,
}

impl LoadOptions {
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Default::default()
        }
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn on_finish(mut self, f: impl FnOnce(&mut Engine) + 'static) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(&mut Engine, &str) + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

/// What [`load`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The last completed load used the same query.
    Cached,
    /// An identical request is already in flight.
    InFlight,
    Requested(Ticket),
}

/// A request waiting for its response.
pub(crate) struct PendingLoad {
    pub host: NodeId,
    pub generation: u64,
    pub query: Value,
    pub reset: bool,
    pub seed: Option<Attrs>,
    pub on_finish: Vec<Continuation>,
    pub on_failure: Vec<FailureContinuation>,
}

/// Load the host's rows from its data source.
pub fn load(engine: &mut Engine, host: &str, options: LoadOptions) -> Result<LoadOutcome> {
    let binding = engine
        .registry
        .object(host)
        .ok_or_else(|| EngineError::UnknownIdentity(host.to_string()))?
        .template
        .as_ref()
        .ok_or_else(|| EngineError::NotATemplate(host.to_string()))?;
    let source = binding
        .source
        .clone()
        .ok_or_else(|| EngineError::NoDataSource(host.to_string()))?;
    let query = options.query.clone().unwrap_or(source.query);

    if binding.loaded && binding.last_query.as_ref() == Some(&query) {
        debug!(host, "load skipped, query unchanged");
        if let Some(on_finish) = options.on_finish {
            on_finish(engine);
        }
        return Ok(LoadOutcome::Cached);
    }

    if binding.in_flight.as_ref() == Some(&query) {
        let generation = binding.generation;
        if let Some(pending) = engine
            .pending_requests
            .values_mut()
            .find(|p| p.host == host && p.generation == generation)
        {
            pending.on_finish.extend(options.on_finish);
            pending.on_failure.extend(options.on_failure);
            debug!(host, generation, "joined request in flight");
            return Ok(LoadOutcome::InFlight);
        }
    }

    let generation = match engine.registry.object_mut(host).and_then(|n| n.template.as_mut()) {
        Some(binding) => {
            binding.generation += 1;
            binding.in_flight = Some(query.clone());
            binding.generation
        }
        None => return Err(EngineError::NotATemplate(host.to_string())),
    };

    set_loading(engine, true);
    let request = Request {
        url: source.url,
        query: query.clone(),
    };
    let pending = PendingLoad {
        host: host.to_string(),
        generation,
        query,
        reset: options.reset,
        seed: options.seed,
        on_finish: options.on_finish.into_iter().collect(),
        on_failure: options.on_failure.into_iter().collect(),
    };
    let ticket = engine.issue_request(request, pending);
    debug!(host, generation, %ticket, "load requested");
    Ok(LoadOutcome::Requested(ticket))
}

/// Apply a response to the host it was requested for.
pub(crate) fn complete(
    engine: &mut Engine,
    pending: PendingLoad,
    result: std::result::Result<Value, String>,
) -> Result<()> {
    if engine.pending_requests.is_empty() {
        set_loading(engine, false);
    }

    let Some(binding) = engine
        .registry
        .object_mut(&pending.host)
        .and_then(|n| n.template.as_mut())
    else {
        debug!(host = %pending.host, "response for a removed host");
        return Ok(());
    };
    if binding.generation != pending.generation {
        debug!(
            host = %pending.host,
            generation = pending.generation,
            current = binding.generation,
            "stale response dropped"
        );
        return Ok(());
    }
    binding.in_flight = None;

    match result {
        Ok(value) => {
            binding.loaded = true;
            binding.last_query = Some(pending.query.clone());
            let rows = match &pending.seed {
                Some(seed) => vec![Value::Object(seeded_row(seed, normalize_rows(value)))],
                None => normalize_rows(value),
            };
            let options = DuplicateOptions {
                reset: pending.reset,
                ..Default::default()
            };
            duplicate_with_data(engine, &pending.host, Value::Array(rows), options)?;
            for on_finish in pending.on_finish {
                on_finish(engine);
            }
        }
        Err(reason) => {
            warn!(host = %pending.host, %reason, "template load failed");
            for on_failure in pending.on_failure {
                on_failure(engine, &reason);
            }
        }
    }
    Ok(())
}

fn seeded_row(seed: &Attrs, rows: Vec<Value>) -> Attrs {
    let mut row = seed.clone();
    if let Some(Value::Object(first)) = rows.into_iter().next() {
        overlay(&mut row, &first);
    }
    row
}

fn set_loading(engine: &mut Engine, visible: bool) {
    let indicator = engine.config.loading_indicator.clone();
    if !engine.registry.contains(&indicator) || !engine.target.exists(&indicator) {
        return;
    }
    let kind = if visible {
        TransitionKind::QuickShow
    } else {
        TransitionKind::QuickHide
    };
    engine.run_transition(Transition::new(indicator, kind), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DataSource, Descriptor, TemplateSpec};
    use crate::renderer::MemoryTarget;
    use crate::services::{QueuedNetwork, RecordingTransitions};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixture {
        engine: Engine,
        network: QueuedNetwork,
        transitions: RecordingTransitions,
    }

    fn fixture() -> Fixture {
        let network = QueuedNetwork::new();
        let transitions = RecordingTransitions::immediate();
        let mut engine = Engine::builder()
            .target(MemoryTarget::new())
            .network(network.clone())
            .transitions(transitions.clone())
            .build()
            .unwrap();
        let app = Descriptor::new("app")
            .with_id("app")
            .with_child(Descriptor::new("loading").with_id("loading"))
            .with_child(Descriptor::new("template").with_id("people").with_template(TemplateSpec {
                row: Descriptor::new("container"),
                objects: vec![Descriptor::new("label").with_behavior("text", "{{name}}")],
                source: Some(DataSource {
                    url: "/people".into(),
                    query: json!({ "page": 1 }),
                }),
            }));
        engine.create(app).unwrap();
        engine.rebuild("app", None).unwrap();
        Fixture {
            engine,
            network,
            transitions,
        }
    }

    fn duplicates(engine: &Engine) -> usize {
        engine.object("people").unwrap().template.as_ref().unwrap().duplicate_ids.len()
    }

    #[test]
    fn test_load_and_complete() {
        let mut f = fixture();
        let outcome = load(&mut f.engine, "people", LoadOptions::default()).unwrap();
        let (ticket, request) = f.network.last().unwrap();
        assert_eq!(outcome, LoadOutcome::Requested(ticket));
        assert_eq!(request.url, "/people");
        assert_eq!(request.query, json!({ "page": 1 }));

        f.engine
            .complete_request(ticket, Ok(json!([{ "name": "a" }, { "name": "b" }])))
            .unwrap();
        assert_eq!(duplicates(&f.engine), 2);
        assert_eq!(f.transitions.of_kind(TransitionKind::QuickShow), ["loading"]);
        assert_eq!(f.transitions.of_kind(TransitionKind::QuickHide), ["loading"]);
    }

    #[test]
    fn test_same_query_is_cached() {
        let mut f = fixture();
        load(&mut f.engine, "people", LoadOptions::default()).unwrap();
        let (ticket, _) = f.network.take().remove(0);
        f.engine.complete_request(ticket, Ok(json!([{ "name": "a" }]))).unwrap();

        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let outcome = load(&mut f.engine, "people", LoadOptions::default().on_finish(move |_| flag.set(true)))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Cached);
        assert!(ran.get());
        assert!(f.network.is_empty());
        assert_eq!(duplicates(&f.engine), 1);
    }

    #[test]
    fn test_identical_request_in_flight_is_joined() {
        let mut f = fixture();
        load(&mut f.engine, "people", LoadOptions::default()).unwrap();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let outcome = load(&mut f.engine, "people", LoadOptions::default().on_finish(move |_| c.set(c.get() + 1)))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::InFlight);
        assert_eq!(f.network.len(), 1);

        let (ticket, _) = f.network.take().remove(0);
        f.engine.complete_request(ticket, Ok(json!([]))).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_stale_response_dropped() {
        let mut f = fixture();
        load(&mut f.engine, "people", LoadOptions::default()).unwrap();
        load(&mut f.engine, "people", LoadOptions::reset().query(json!({ "page": 2 }))).unwrap();
        let requests = f.network.take();
        assert_eq!(requests.len(), 2);

        f.engine
            .complete_request(requests[1].0, Ok(json!([{ "name": "new" }])))
            .unwrap();
        f.engine
            .complete_request(requests[0].0, Ok(json!([{ "name": "old" }])))
            .unwrap();

        let binding = f.engine.object("people").unwrap().template.clone().unwrap();
        assert_eq!(binding.data_rows, [json!({ "name": "new" })]);
        assert_eq!(binding.last_query, Some(json!({ "page": 2 })));
    }

    #[test]
    fn test_failure_runs_callback() {
        let mut f = fixture();
        let reason = Rc::new(std::cell::RefCell::new(String::new()));
        let r = reason.clone();
        load(
            &mut f.engine,
            "people",
            LoadOptions::default().on_failure(move |_, why| *r.borrow_mut() = why.to_string()),
        )
        .unwrap();
        let (ticket, _) = f.network.take().remove(0);
        f.engine.complete_request(ticket, Err("503".into())).unwrap();

        assert_eq!(*reason.borrow(), "503");
        assert_eq!(duplicates(&f.engine), 0);
        assert!(!f.engine.object("people").unwrap().template.as_ref().unwrap().loaded);
    }

    #[test]
    fn test_unknown_ticket() {
        let mut f = fixture();
        assert!(matches!(
            f.engine.complete_request(Ticket(99), Ok(Value::Null)),
            Err(EngineError::UnknownTicket(Ticket(99)))
        ));
    }

    #[test]
    fn test_no_data_source() {
        let mut f = fixture();
        f.engine
            .create(Descriptor::new("template").with_id("local"))
            .unwrap();
        assert!(matches!(
            load(&mut f.engine, "local", LoadOptions::default()),
            Err(EngineError::NoDataSource(_))
        ));
    }
}
