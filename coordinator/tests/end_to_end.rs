use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use common::{app, indexer, wordcount, Application, FileLayout, KeyValue, TaskPhase};
use coordinator::handlers::build_router;
use coordinator::{AppState, Scheduler};
use tokio::net::TcpListener;
use worker::{ExitReason, Worker, WorkerConfig, WorkerSummary};

fn temp_dir(sub: &str) -> PathBuf {
    let base = env::temp_dir().join("mapreduce_e2e").join(sub);
    let _ = fs::remove_dir_all(&base);
    fs::create_dir_all(&base).unwrap();
    base
}

fn write_inputs(dir: &Path, docs: &[(&str, &str)]) -> Vec<String> {
    docs.iter()
        .map(|(name, text)| {
            let path = dir.join(name);
            fs::write(&path, text).unwrap();
            path.to_string_lossy().to_string()
        })
        .collect()
}

async fn start_coordinator(
    inputs: Vec<String>,
    n_reduce: usize,
    timeout: Duration,
    layout: FileLayout,
) -> (String, AppState) {
    let scheduler = Scheduler::new(inputs, n_reduce, timeout).unwrap();
    let state = AppState::new(scheduler, layout);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn worker_config(url: &str, layout: &FileLayout) -> WorkerConfig {
    WorkerConfig {
        coordinator_url: url.to_string(),
        poll_interval: Duration::from_millis(20),
        rpc_timeout: Duration::from_secs(5),
        layout: layout.clone(),
    }
}

async fn run_workers(workers: Vec<Worker>) -> Vec<WorkerSummary> {
    let handles: Vec<_> = workers.into_iter().map(|w| tokio::spawn(w.run())).collect();
    let mut out = Vec::new();
    for h in handles {
        let summary = tokio::time::timeout(Duration::from_secs(60), h)
            .await
            .expect("el worker no terminó a tiempo")
            .unwrap()
            .unwrap();
        out.push(summary);
    }
    out
}

/// Lee todos los mr-out-*: (archivo, clave) -> valor.
fn read_outputs(layout: &FileLayout) -> Vec<(String, String, String)> {
    let mut out = Vec::new();
    for entry in fs::read_dir(&layout.work_dir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().to_string();
        if !layout.is_output_name(&name) {
            continue;
        }
        for line in fs::read_to_string(entry.path()).unwrap().lines() {
            let (k, v) = line.split_once(' ').unwrap();
            out.push((name.clone(), k.to_string(), v.to_string()));
        }
    }
    out
}

fn expected_counts(docs: &[(&str, &str)]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for (_, text) in docs {
        for w in wordcount::tokenize(text) {
            *counts.entry(w).or_insert(0) += 1;
        }
    }
    counts
}

const DOCS: &[(&str, &str)] = &[
    ("pg-1.txt", "El gato come. El perro duerme."),
    ("pg-2.txt", "Un gato, dos gatos; tres gatos!"),
    ("pg-3.txt", "el fin del fin"),
];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wordcount_con_varios_workers() {
    let dir = temp_dir("wordcount");
    let inputs = write_inputs(&dir, DOCS);
    let layout = FileLayout::in_dir(&dir);
    let (url, state) = start_coordinator(inputs, 2, Duration::from_secs(10), layout.clone()).await;

    let wc = app::named("wc").unwrap();
    let workers = (0..3)
        .map(|_| Worker::new(worker_config(&url, &layout), wc).unwrap())
        .collect();
    let summaries = run_workers(workers).await;

    assert!(summaries.iter().all(|s| s.exit == ExitReason::JobFinished));
    assert_eq!(summaries.iter().map(|s| s.map_tasks).sum::<u32>(), 3);
    assert!(state.scheduler().done());

    let outputs = read_outputs(&layout);
    let mut files: Vec<&str> = outputs.iter().map(|(f, _, _)| f.as_str()).collect();
    files.sort();
    files.dedup();
    // las palabras de DOCS caen en los dos buckets: un archivo por bucket
    assert_eq!(files, vec!["mr-out-0", "mr-out-1"]);

    // cada clave aparece en un solo archivo y la unión da el conteo esperado
    let mut got: HashMap<String, usize> = HashMap::new();
    for (_, k, v) in &outputs {
        assert!(got.insert(k.clone(), v.parse().unwrap()).is_none(), "clave repetida {}", k);
    }
    assert_eq!(got, expected_counts(DOCS));

    let info = state.scheduler().job_info();
    assert_eq!(info.map_done, 3);
    assert!(info.finished_at.is_some());
}

fn slow_map(source: &str, contents: &str) -> Vec<KeyValue> {
    if source.ends_with("pg-1.txt") {
        std::thread::sleep(Duration::from_millis(1_500));
    }
    wordcount::map(source, contents)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_lento_pierde_la_tarea_y_el_job_termina() {
    let dir = temp_dir("lento");
    let inputs = write_inputs(&dir, DOCS);
    let layout = FileLayout::in_dir(&dir);
    let (url, state) =
        start_coordinator(inputs, 2, Duration::from_millis(300), layout.clone()).await;

    let slow_app = Application {
        name: "wc-lento",
        map_fn: slow_map,
        reduce_fn: wordcount::reduce,
    };
    // el lento toma pg-1.txt (la primera tarea) y se cuelga
    let slow = Worker::new(worker_config(&url, &layout), slow_app).unwrap();
    let slow_handle = tokio::spawn(slow.run());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fast = Worker::new(worker_config(&url, &layout), app::named("wc").unwrap()).unwrap();
    let fast_id = fast.id().to_string();
    let fast_summary = run_workers(vec![fast]).await.remove(0);
    let slow_summary = tokio::time::timeout(Duration::from_secs(60), slow_handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(fast_summary.exit, ExitReason::JobFinished);
    assert_eq!(slow_summary.exit, ExitReason::JobFinished);
    assert!(state.scheduler().job_info().reassignments >= 1);
    {
        let scheduler = state.scheduler();
        let map0 = scheduler.task(TaskPhase::Map, 0).unwrap();
        assert_eq!(map0.owner.as_deref(), Some(fast_id.as_str()));
        assert_eq!(map0.attempts, 2);
    }

    let mut got: HashMap<String, usize> = HashMap::new();
    for (_, k, v) in read_outputs(&layout) {
        assert!(got.insert(k, v.parse().unwrap()).is_none());
    }
    assert_eq!(got, expected_counts(DOCS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn entrada_faltante_se_reporta_y_el_job_termina() {
    let dir = temp_dir("faltante");
    let mut inputs = write_inputs(&dir, &DOCS[..1]);
    inputs.push(dir.join("borrado.txt").to_string_lossy().to_string());
    let layout = FileLayout::in_dir(&dir);
    let (url, state) = start_coordinator(inputs, 3, Duration::from_secs(10), layout.clone()).await;

    let w = Worker::new(worker_config(&url, &layout), app::named("wc").unwrap()).unwrap();
    let summary = run_workers(vec![w]).await.remove(0);

    assert_eq!(summary.exit, ExitReason::JobFinished);
    assert_eq!(summary.unrunnable, 1);
    let info = state.scheduler().job_info();
    assert!(info.done);
    assert_eq!(info.map_unrunnable, 1);

    let got: HashMap<String, usize> = read_outputs(&layout)
        .into_iter()
        .map(|(_, k, v)| (k, v.parse().unwrap()))
        .collect();
    assert_eq!(got, expected_counts(&DOCS[..1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn indexer_lista_documentos_por_palabra() {
    let dir = temp_dir("indexer");
    let inputs = write_inputs(&dir, &[("a.txt", "hola mundo"), ("b.txt", "hola hola")]);
    let layout = FileLayout::in_dir(&dir);
    let (url, _state) = start_coordinator(inputs.clone(), 1, Duration::from_secs(10), layout.clone()).await;

    let w = Worker::new(worker_config(&url, &layout), app::named("indexer").unwrap()).unwrap();
    run_workers(vec![w]).await;

    let got: HashMap<String, String> = read_outputs(&layout)
        .into_iter()
        .map(|(_, k, v)| (k, v))
        .collect();
    assert_eq!(got["hola"], indexer::reduce("hola", &inputs));
    assert_eq!(got["mundo"], format!("1 {}", inputs[0]));
}
