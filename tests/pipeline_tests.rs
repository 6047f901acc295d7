//! Pipeline invariant tests with instrumented stub providers: conservation,
//! order preservation, failure isolation, concurrency bounds, and abort
//! behavior.

use async_trait::async_trait;
use citation_pipeline::clients::{AnalysisProvider, CaseLookupProvider};
use citation_pipeline::pipeline::CitationPipeline;
use citation_pipeline::{
    AnalysisResult, AnalysisVerdict, CaseRecord, Config, ExtractedCitation, FailureKind,
    LookupResult, RemoteFailure,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Per-call instrumentation shared by both stub providers
#[derive(Default)]
struct CallStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallStats {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stub analysis provider with configurable per-citation delays and failures
#[derive(Default)]
struct StubAnalysis {
    stats: CallStats,
    fail_indices: HashSet<usize>,
    /// Delay in milliseconds applied per citation index
    delay_for: Option<fn(usize) -> u64>,
}

#[async_trait]
impl AnalysisProvider for StubAnalysis {
    fn name(&self) -> &str {
        "stub-analysis"
    }

    async fn analyze(&self, citation: &ExtractedCitation) -> AnalysisResult {
        self.stats.enter();
        if let Some(delay_for) = self.delay_for {
            sleep(Duration::from_millis(delay_for(citation.index))).await;
        }
        self.stats.exit();

        if self.fail_indices.contains(&citation.index) {
            Err(RemoteFailure::transient("analysis unavailable"))
        } else {
            Ok(AnalysisVerdict {
                verdict: format!("Citation {} appears accurate.", citation.index),
                model: "stub-model".to_string(),
            })
        }
    }
}

/// Stub lookup provider with configurable misses, failures, and delays
#[derive(Default)]
struct StubLookup {
    stats: CallStats,
    fail_indices: HashSet<usize>,
    miss_indices: HashSet<usize>,
    delay_for: Option<fn(usize) -> u64>,
}

#[async_trait]
impl CaseLookupProvider for StubLookup {
    fn name(&self) -> &str {
        "stub-lookup"
    }

    async fn lookup(&self, citation: &ExtractedCitation) -> LookupResult {
        self.stats.enter();
        if let Some(delay_for) = self.delay_for {
            sleep(Duration::from_millis(delay_for(citation.index))).await;
        }
        self.stats.exit();

        if self.fail_indices.contains(&citation.index) {
            Err(RemoteFailure::permanent("citation rejected").with_status(400))
        } else if self.miss_indices.contains(&citation.index) {
            Ok(None)
        } else {
            Ok(Some(CaseRecord {
                case_name: Some(format!("Case {}", citation.index)),
                court: Some("Test Court".to_string()),
                date_filed: None,
                docket_number: None,
                citations: vec![citation.normalized.clone()],
                absolute_url: None,
            }))
        }
    }
}

fn citations(n: usize) -> Vec<ExtractedCitation> {
    (0..n)
        .map(|index| ExtractedCitation {
            index,
            text: format!("{} U.S. {} (1973)", index + 1, index + 100),
            normalized: format!("{} U.S. {} (1973)", index + 1, index + 100),
            case_name: None,
            volume: Some((index + 1).to_string()),
            reporter: Some("U.S.".to_string()),
            page: Some((index + 100).to_string()),
            year: Some(1973),
            position: index * 40,
            context: None,
        })
        .collect()
}

fn config(batch_size: usize, concurrency: usize) -> Config {
    let mut config = Config::default();
    config.pipeline.batch_size = batch_size;
    config.pipeline.max_concurrent_citations = concurrency;
    config
}

fn pipeline_with(
    config: Config,
    analysis: StubAnalysis,
    lookup: StubLookup,
) -> (CitationPipeline, Arc<StubAnalysis>, Arc<StubLookup>) {
    let analysis = Arc::new(analysis);
    let lookup = Arc::new(lookup);
    let pipeline = CitationPipeline::new(
        config,
        Arc::clone(&analysis) as Arc<dyn AnalysisProvider>,
        Arc::clone(&lookup) as Arc<dyn CaseLookupProvider>,
    )
    .unwrap();
    (pipeline, analysis, lookup)
}

#[tokio::test]
async fn conservation_under_mixed_failures() {
    let analysis = StubAnalysis {
        fail_indices: [1, 4, 7].into_iter().collect(),
        ..Default::default()
    };
    let lookup = StubLookup {
        fail_indices: [2, 4].into_iter().collect(),
        miss_indices: [5].into_iter().collect(),
        ..Default::default()
    };
    let (pipeline, _, _) = pipeline_with(config(3, 4), analysis, lookup);

    let report = pipeline.process(citations(9)).await;

    assert_eq!(report.total(), 9);
    let indices: Vec<usize> = report.entries.iter().map(|e| e.citation.index).collect();
    assert_eq!(indices, (0..9).collect::<Vec<_>>());
    assert_eq!(report.analysis_failures, 3);
    assert_eq!(report.lookup_failures, 2);
}

#[tokio::test]
async fn order_preserved_under_variable_delays() {
    // Later citations finish first; output order must not care
    let analysis = StubAnalysis {
        delay_for: Some(|index| (8 - index as u64) * 15),
        ..Default::default()
    };
    let lookup = StubLookup {
        delay_for: Some(|index| (index as u64) * 7),
        ..Default::default()
    };
    let (pipeline, _, _) = pipeline_with(config(8, 8), analysis, lookup);

    let report = pipeline.process(citations(8)).await;

    let indices: Vec<usize> = report.entries.iter().map(|e| e.citation.index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
    for (i, entry) in report.entries.iter().enumerate() {
        let verdict = entry.analysis.as_ref().unwrap();
        assert_eq!(verdict.verdict, format!("Citation {} appears accurate.", i));
    }
}

#[tokio::test]
async fn analysis_failure_is_isolated_to_one_citation() {
    let analysis = StubAnalysis {
        fail_indices: [3].into_iter().collect(),
        ..Default::default()
    };
    let (pipeline, _, lookup) = pipeline_with(config(2, 2), analysis, StubLookup::default());

    let report = pipeline.process(citations(6)).await;

    assert_eq!(report.total(), 6);
    assert_eq!(report.analysis_failures, 1);
    assert_eq!(report.lookup_failures, 0);

    // Citation 3's lookup was still attempted and recorded independently
    let entry = &report.entries[3];
    assert!(entry.analysis.is_err());
    let record = entry.lookup.as_ref().unwrap().as_ref().unwrap();
    assert_eq!(record.case_name.as_deref(), Some("Case 3"));

    // Every other citation is untouched
    for (i, entry) in report.entries.iter().enumerate() {
        if i != 3 {
            assert!(entry.analysis.is_ok());
        }
        assert!(entry.lookup.is_ok());
    }
    assert_eq!(lookup.stats.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn lookup_miss_is_success_not_failure() {
    let lookup = StubLookup {
        miss_indices: [1].into_iter().collect(),
        ..Default::default()
    };
    let (pipeline, _, _) = pipeline_with(config(5, 5), StubAnalysis::default(), lookup);

    let report = pipeline.process(citations(3)).await;

    assert_eq!(report.lookup_failures, 0);
    assert!(matches!(report.entries[1].lookup, Ok(None)));
    assert!(report.entries[1].analysis.is_ok());
    assert!(report.is_clean());
}

#[tokio::test]
async fn concurrency_never_exceeds_configured_ceiling() {
    let analysis = StubAnalysis {
        delay_for: Some(|_| 25),
        ..Default::default()
    };
    let lookup = StubLookup {
        delay_for: Some(|_| 25),
        ..Default::default()
    };
    let (pipeline, analysis, lookup) = pipeline_with(config(7, 3), analysis, lookup);

    let report = pipeline.process(citations(20)).await;
    assert_eq!(report.total(), 20);

    // Each citation unit performs exactly one call per service, so the peak
    // of concurrent calls per service equals the peak of in-flight units
    let max_analysis = analysis.stats.max_in_flight.load(Ordering::SeqCst);
    let max_lookup = lookup.stats.max_in_flight.load(Ordering::SeqCst);
    assert!(max_analysis <= 3, "analysis peak {} exceeds C", max_analysis);
    assert!(max_lookup <= 3, "lookup peak {} exceeds C", max_lookup);
    assert!(max_analysis >= 2, "pipeline never ran units concurrently");
}

#[tokio::test]
async fn empty_input_issues_no_remote_calls() {
    let (pipeline, analysis, lookup) =
        pipeline_with(config(5, 5), StubAnalysis::default(), StubLookup::default());

    let report = pipeline.check_text("").await;

    assert_eq!(report.total(), 0);
    assert_eq!(report.failure_total(), 0);
    assert_eq!(analysis.stats.calls.load(Ordering::SeqCst), 0);
    assert_eq!(lookup.stats.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn full_text_run_all_success() {
    let text = "Roe v. Wade, 410 U.S. 113 (1973) and Brown v. Board of Education, \
        347 U.S. 483 (1954) both matter here.";
    let (pipeline, _, _) =
        pipeline_with(config(5, 5), StubAnalysis::default(), StubLookup::default());

    let report = pipeline.check_text(text).await;

    assert_eq!(report.total(), 2);
    assert_eq!(report.failure_total(), 0);
    assert_eq!(
        report.entries[0].citation.case_name.as_deref(),
        Some("Roe v. Wade")
    );
    assert_eq!(
        report.entries[1].citation.case_name.as_deref(),
        Some("Brown v. Board of Education")
    );
    assert!(report.entries[0].analysis.is_ok());
    assert!(report.entries[1].lookup.is_ok());
}

#[tokio::test]
async fn pre_cancelled_run_returns_all_aborted_markers() {
    let (pipeline, analysis, _) =
        pipeline_with(config(2, 2), StubAnalysis::default(), StubLookup::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = pipeline.process_with_cancel(citations(5), &cancel).await;

    // Conservation holds even when nothing ran
    assert_eq!(report.total(), 5);
    assert_eq!(analysis.stats.calls.load(Ordering::SeqCst), 0);
    for entry in &report.entries {
        let failure = entry.analysis.as_ref().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Transient);
        assert!(failure.message.contains("aborted"));
        assert!(entry.lookup.is_err());
    }
}

#[tokio::test]
async fn mid_run_cancel_drains_current_batch() {
    let analysis = StubAnalysis {
        delay_for: Some(|_| 80),
        ..Default::default()
    };
    let (pipeline, _, _) = pipeline_with(config(2, 2), analysis, StubLookup::default());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });
    }

    let report = pipeline.process_with_cancel(citations(6), &cancel).await;

    // The partial report still covers every input citation
    assert_eq!(report.total(), 6);

    // The first batch was in flight when the cancel landed, so it drained
    assert!(report.entries[0].analysis.is_ok());
    assert!(report.entries[1].analysis.is_ok());

    // Later batches never started and carry aborted markers
    for entry in &report.entries[2..] {
        let failure = entry.analysis.as_ref().unwrap_err();
        assert!(failure.message.contains("aborted"));
    }
}
