use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysreview_helper::{
    ArticlePayload, ArticleRecord, ErrorClass, Job, JobResult, OracleFailure, RunSettings,
    ScoringOracle, ScoringOrchestrator,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 一次调用的预设行为
#[derive(Debug, Clone)]
enum Step {
    Reply(&'static str),
    Fail(ErrorClass),
    Panic,
}

/// 按标题返回预设响应的评分服务，同时记录并发情况
struct MockOracle {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Step,
    latency: Box<dyn Fn(&str) -> Duration + Send + Sync>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockOracle {
    fn new(fallback: Step) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            latency: Box::new(|_| Duration::from_millis(100)),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn script(self, title: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(title.to_string(), steps.into());
        self
    }

    fn latency(mut self, f: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Box::new(f);
        self
    }

    fn calls(&self, title: &str) -> u32 {
        self.calls.lock().unwrap().get(title).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ScoringOracle for MockOracle {
    async fn score(&self, _theme: &str, payload: &ArticlePayload) -> Result<String, OracleFailure> {
        let title = payload.title.as_str();
        *self.calls.lock().unwrap().entry(title.to_string()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep((self.latency)(title)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(title)
            .and_then(|steps| steps.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Reply(text) => Ok(text.to_string()),
            Step::Fail(class) => Err(OracleFailure::new(class, format!("scripted {}", class))),
            Step::Panic => panic!("scripted panic for {}", title),
        }
    }
}

fn jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| {
            Job::new(
                i,
                ArticlePayload {
                    title: format!("article-{}", i),
                    abstract_text: format!("abstract {}", i),
                },
            )
        })
        .collect()
}

fn settings(max_concurrent: usize) -> RunSettings {
    RunSettings {
        max_concurrent,
        ..RunSettings::default()
    }
}

fn article_index(title: &str) -> u64 {
    title.trim_start_matches("article-").parse().unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn results_keep_input_order_with_uneven_latency() {
    let mut oracle = MockOracle::new(Step::Reply("5"))
        // 越靠前的文献越慢
        .latency(|title| Duration::from_millis(50 + (40 - article_index(title)) * 37 % 400));
    for (i, reply) in ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"].into_iter().enumerate() {
        oracle = oracle.script(&format!("article-{}", i), vec![Step::Reply(reply)]);
    }

    let orchestrator = ScoringOrchestrator::new(Arc::new(oracle), settings(4));
    let results = orchestrator.run(jobs(40), "theme").await;

    assert_eq!(results.len(), 40);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.index, i);
        assert!(!result.failed);
    }
    for i in 0..10 {
        assert_eq!(results[i].score, Some(i as u8 + 1));
    }
    assert!(results[10..].iter().all(|r| r.score == Some(5)));
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_cap() {
    let oracle = Arc::new(
        MockOracle::new(Step::Reply("6"))
            .latency(|title| Duration::from_millis(20 + article_index(title) % 7 * 30)),
    );
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(3));
    let results = orchestrator.run(jobs(30), "theme").await;

    assert_eq!(results.len(), 30);
    assert_eq!(oracle.peak(), 3);
    assert_eq!(orchestrator.admission().peak_in_flight(), 3);
    assert_eq!(orchestrator.admission().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn twenty_jobs_with_cap_five_take_four_rounds() {
    let oracle = MockOracle::new(Step::Reply("8")).latency(|_| Duration::from_secs(1));
    let orchestrator = ScoringOrchestrator::new(Arc::new(oracle), settings(5));

    let started = Instant::now();
    let results = orchestrator.run(jobs(20), "theme").await;
    let elapsed = started.elapsed();

    assert!(results.iter().all(|r| r.score == Some(8)));
    assert!(elapsed >= Duration::from_secs(4), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_exhaust_after_max_retries() {
    let oracle = Arc::new(MockOracle::new(Step::Reply("4")).script(
        "article-1",
        vec![Step::Fail(ErrorClass::Transient); 10],
    ));
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(2));
    let results = orchestrator.run(jobs(3), "theme").await;

    assert_eq!(results[1], JobResult::failed(1, 5));
    assert_eq!(oracle.calls("article-1"), 5);
    assert_eq!(results[0].score, Some(4));
    assert_eq!(results[2].score, Some(4));
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_is_not_retried() {
    let oracle = Arc::new(
        MockOracle::new(Step::Reply("4")).script("article-0", vec![Step::Fail(ErrorClass::Fatal)]),
    );
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(2));
    let results = orchestrator.run(jobs(2), "theme").await;

    assert_eq!(results[0], JobResult::failed(0, 1));
    assert_eq!(oracle.calls("article-0"), 1);
    assert_eq!(results[1], JobResult::succeeded(1, 4, 1));
}

#[tokio::test(start_paused = true)]
async fn unrecognized_reply_is_retried_until_a_score_appears() {
    let oracle = Arc::new(MockOracle::new(Step::Reply("3")).script(
        "article-0",
        vec![
            Step::Reply("I cannot decide"),
            Step::Reply("Score: 12 out of 10"),
            Step::Reply("Relevance: 9"),
        ],
    ));
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(1));
    let results = orchestrator.run(jobs(1), "theme").await;

    assert_eq!(results[0], JobResult::succeeded(0, 9, 3));
}

#[tokio::test(start_paused = true)]
async fn quota_errors_are_retried_by_default() {
    let oracle = Arc::new(MockOracle::new(Step::Reply("5")).script(
        "article-3",
        vec![
            Step::Fail(ErrorClass::QuotaExceeded),
            Step::Fail(ErrorClass::QuotaExceeded),
            Step::Reply("7"),
        ],
    ));
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(5));
    let results = orchestrator.run(jobs(10), "theme").await;

    assert!(results.iter().all(|r| !r.failed));
    assert_eq!(results[3], JobResult::succeeded(3, 7, 3));
    assert_eq!(oracle.total_calls(), 12);
}

#[tokio::test(start_paused = true)]
async fn quota_exhaustion_leaves_other_jobs_untouched() {
    let oracle = Arc::new(MockOracle::new(Step::Reply("5")).script(
        "article-3",
        vec![Step::Fail(ErrorClass::QuotaExceeded); 10],
    ));
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(5));
    let results = orchestrator.run(jobs(10), "theme").await;

    assert_eq!(results[3], JobResult::failed(3, 5));
    assert_eq!(oracle.calls("article-3"), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.index, i);
        if i != 3 {
            assert_eq!(*result, JobResult::succeeded(i, 5, 1));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn quota_errors_can_fail_fast() {
    let oracle = Arc::new(
        MockOracle::new(Step::Reply("5"))
            .script("article-3", vec![Step::Fail(ErrorClass::QuotaExceeded); 5]),
    );
    let orchestrator = ScoringOrchestrator::new(
        oracle.clone(),
        RunSettings {
            give_up_on_quota: true,
            ..settings(5)
        },
    );
    let results = orchestrator.run(jobs(10), "theme").await;

    assert_eq!(results[3], JobResult::failed(3, 1));
    assert_eq!(results.iter().filter(|r| r.failed).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_backoff_releases_the_token() {
    // 唯一的令牌在退避期间必须让给其他文献
    let oracle = Arc::new(
        MockOracle::new(Step::Reply("2"))
            .script(
                "article-0",
                vec![Step::Fail(ErrorClass::RateLimited), Step::Reply("9")],
            )
            .latency(|_| Duration::from_millis(100)),
    );
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(1));

    let started = Instant::now();
    let results = orchestrator.run(jobs(3), "theme").await;

    assert_eq!(results[0], JobResult::succeeded(0, 9, 2));
    assert_eq!(results[1].score, Some(2));
    assert_eq!(results[2].score, Some(2));
    // 3s 退避 + 0.1s 重试 + 间隔，其余两篇在退避期间完成
    assert!(started.elapsed() < Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_pending_and_backoff_jobs() {
    let oracle = Arc::new(MockOracle::new(Step::Reply("6")).latency(|_| Duration::from_secs(1)));
    let cancel = CancellationToken::new();
    let orchestrator =
        ScoringOrchestrator::new(oracle.clone(), settings(2)).with_cancellation(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let results = orchestrator.run(jobs(10), "theme").await;

    assert_eq!(results.len(), 10);
    // 已经在调用中的文献照常完成
    assert!(results[..4].iter().all(|r| r.score == Some(6)));
    assert!(results[4..].iter().all(|r| r.failed && r.attempts == 0));
    assert_eq!(oracle.total_calls(), 4);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn panicking_job_is_reported_as_failed() {
    let oracle = Arc::new(MockOracle::new(Step::Reply("5")).script("article-1", vec![Step::Panic]));
    let orchestrator = ScoringOrchestrator::new(oracle.clone(), settings(2));
    let results = orchestrator.run(jobs(4), "theme").await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[1], JobResult::failed(1, 0));
    assert!(results.iter().filter(|r| r.index != 1).all(|r| r.score == Some(5)));
    assert_eq!(orchestrator.admission().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn progress_events_cover_every_job() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let oracle = MockOracle::new(Step::Reply("5"))
        .script("article-2", vec![Step::Fail(ErrorClass::Fatal)]);
    let orchestrator = ScoringOrchestrator::new(Arc::new(oracle), settings(3)).with_progress(tx);
    orchestrator.run(jobs(12), "theme").await;
    drop(orchestrator);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 12);
    assert!(events.iter().all(|e| e.snapshot.total == 12));
    let failed: Vec<usize> = events
        .iter()
        .filter(|e| e.score.is_none())
        .map(|e| e.index)
        .collect();
    assert_eq!(failed, vec![2]);
}

/// 真实 API 端到端测试
///
/// 运行方式：
/// ```bash
/// OPENAI_API_KEY=sk-... cargo test --test integration_test -- --ignored --nocapture
/// ```
#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_scoring_run() {
    sysreview_helper::utils::logging::init(true);

    let key = std::env::var("OPENAI_API_KEY").expect("需要设置 OPENAI_API_KEY");
    let config = sysreview_helper::Config::default();
    let theme = config.theme.clone();
    let app = sysreview_helper::App::initialize(config, &key).expect("初始化失败");

    let records = vec![
        ArticleRecord {
            title: "A wearable activity tracker intervention to increase physical activity".into(),
            abstract_text: "Randomized trial using Fitbit devices to measure and promote daily steps.".into(),
            ..Default::default()
        },
        ArticleRecord {
            title: "Crystal structure of a bacterial membrane transporter".into(),
            abstract_text: "We report the 2.1 Å structure of a transporter.".into(),
            ..Default::default()
        },
    ];

    let results = app.score_records(&records, &theme).await;
    println!("结果: {:?}", results);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.failed));
}
