//! Registro de tareas y máquina de estados del coordinador.
//!
//! Todo el estado vive en [`Scheduler`]; el servidor HTTP lo envuelve en un
//! único `Mutex` y cada RPC es una sección crítica corta que no bloquea.

use std::{
    collections::HashMap,
    error::Error,
    fmt,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use common::{JobInfo, JobStatus, TaskAssignment, TaskPhase, TaskStatus, WorkerId, WorkerMetrics};
use tracing::{debug, info, warn};

/// Lease por defecto antes de dar una tarea por perdida.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub status: TaskStatus,
    /// Map: el archivo de entrada. Reduce: intermedios registrados (sin repetir).
    pub inputs: Vec<String>,
    pub owner: Option<WorkerId>,
    pub assigned_at: Option<Instant>,
    pub attempts: u32,
}

impl TaskInfo {
    fn new(inputs: Vec<String>) -> Self {
        Self {
            status: TaskStatus::Unassigned,
            inputs,
            owner: None,
            assigned_at: None,
            attempts: 0,
        }
    }

    fn lease_expired(&self, now: Instant, timeout: Duration) -> bool {
        match self.assigned_at {
            Some(at) => now.saturating_duration_since(at) >= timeout,
            None => true,
        }
    }

    fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[derive(Debug, Clone)]
pub struct WorkerMeta {
    pub alive: bool,
    pub first_contact: Instant,
    pub last_contact: Instant,

    // Métricas
    pub tasks_assigned: u64,
    pub tasks_completed: u64,
    pub tasks_unrunnable: u64,
}

impl WorkerMeta {
    fn new(now: Instant) -> Self {
        Self {
            alive: true,
            first_contact: now,
            last_contact: now,
            tasks_assigned: 0,
            tasks_completed: 0,
            tasks_unrunnable: 0,
        }
    }
}

/// Violaciones de protocolo: indican un bug, no una condición recuperable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    NoReduceTasks,
    DuplicateInput(String),
    UnknownWorker(WorkerId),
    UnknownMapTask(String),
    ReduceIndexOutOfRange { index: usize, n_reduce: usize },
    TooManyBuckets { got: usize, n_reduce: usize },
    NeverAssigned { phase: TaskPhase, index: usize },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::NoReduceTasks => write!(f, "n_reduce tiene que ser al menos 1"),
            SchedulerError::DuplicateInput(path) => {
                write!(f, "archivo de entrada repetido: {}", path)
            }
            SchedulerError::UnknownWorker(id) => write!(f, "worker desconocido: {}", id),
            SchedulerError::UnknownMapTask(name) => write!(f, "tarea map desconocida: {}", name),
            SchedulerError::ReduceIndexOutOfRange { index, n_reduce } => write!(
                f,
                "índice reduce {} fuera de rango (n_reduce = {})",
                index, n_reduce
            ),
            SchedulerError::TooManyBuckets { got, n_reduce } => write!(
                f,
                "reporte map con {} buckets (n_reduce = {})",
                got, n_reduce
            ),
            SchedulerError::NeverAssigned { phase, index } => {
                write!(f, "reporte de la tarea {} {} que nunca se asignó", phase, index)
            }
        }
    }
}

impl Error for SchedulerError {}

pub struct Scheduler {
    map_tasks: Vec<TaskInfo>,
    map_index: HashMap<String, usize>,
    reduce_tasks: Vec<TaskInfo>,
    workers: HashMap<WorkerId, WorkerMeta>,
    n_reduce: usize,
    timeout: Duration,

    barrier_crossed: bool,
    reassignments: u32,
    map_unrunnable: usize,
    reduce_unrunnable: usize,
    reduce_skipped: usize,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Scheduler {
    /// Crea una tarea map por archivo (en el orden dado) y `n_reduce` tareas
    /// reduce sin entradas.
    pub fn new(
        files: Vec<String>,
        n_reduce: usize,
        timeout: Duration,
    ) -> Result<Self, SchedulerError> {
        if n_reduce == 0 {
            return Err(SchedulerError::NoReduceTasks);
        }

        let mut map_index = HashMap::with_capacity(files.len());
        let mut map_tasks = Vec::with_capacity(files.len());
        for (i, file) in files.into_iter().enumerate() {
            if map_index.insert(file.clone(), i).is_some() {
                return Err(SchedulerError::DuplicateInput(file));
            }
            map_tasks.push(TaskInfo::new(vec![file]));
        }

        info!(
            "scheduler listo: {} tareas map, {} tareas reduce, lease de {:?}",
            map_tasks.len(),
            n_reduce,
            timeout
        );

        Ok(Self {
            map_tasks,
            map_index,
            reduce_tasks: (0..n_reduce).map(|_| TaskInfo::new(Vec::new())).collect(),
            workers: HashMap::new(),
            n_reduce,
            timeout,
            barrier_crossed: false,
            reassignments: 0,
            map_unrunnable: 0,
            reduce_unrunnable: 0,
            reduce_skipped: 0,
            started_at: Utc::now(),
            finished_at: None,
        })
    }

    fn tasks(&self, phase: TaskPhase) -> &[TaskInfo] {
        match phase {
            TaskPhase::Map => &self.map_tasks,
            TaskPhase::Reduce => &self.reduce_tasks,
        }
    }

    fn tasks_mut(&mut self, phase: TaskPhase) -> &mut Vec<TaskInfo> {
        match phase {
            TaskPhase::Map => &mut self.map_tasks,
            TaskPhase::Reduce => &mut self.reduce_tasks,
        }
    }

    pub fn task(&self, phase: TaskPhase, index: usize) -> Option<&TaskInfo> {
        self.tasks(phase).get(index)
    }

    pub fn worker(&self, worker_id: &str) -> Option<&WorkerMeta> {
        self.workers.get(worker_id)
    }

    /* ---------------- asignación ---------------- */

    /// `AssignTask` con el reloj actual.
    pub fn assign_task(&mut self, worker_id: &str) -> TaskAssignment {
        self.assign_task_at(worker_id, Instant::now())
    }

    /// Decide qué hace `worker_id` ahora.
    ///
    /// 1. La primera tarea map sin asignar, o con el lease vencido.
    /// 2. Si queda alguna map en curso dentro de su lease: `Wait`.
    /// 3. Barrera cruzada: lo mismo con las tareas reduce.
    /// 4. `Exit` cuando todas las reduce están terminadas.
    pub fn assign_task_at(&mut self, worker_id: &str, now: Instant) -> TaskAssignment {
        self.touch(worker_id, now);

        if let Some(assignment) = self.claim_in_phase(TaskPhase::Map, worker_id, now) {
            return assignment;
        }
        if !self.all_done(TaskPhase::Map) {
            return TaskAssignment::Wait;
        }

        self.cross_barrier();

        if let Some(assignment) = self.claim_in_phase(TaskPhase::Reduce, worker_id, now) {
            return assignment;
        }
        if !self.all_done(TaskPhase::Reduce) {
            return TaskAssignment::Wait;
        }

        self.mark_finished();
        TaskAssignment::Exit
    }

    /// Busca, en orden, una tarea de `phase` que `worker_id` pueda tomar.
    fn claim_in_phase(
        &mut self,
        phase: TaskPhase,
        worker_id: &str,
        now: Instant,
    ) -> Option<TaskAssignment> {
        let timeout = self.timeout;
        let index = self.tasks(phase).iter().position(|t| match t.status {
            TaskStatus::Unassigned => !(phase == TaskPhase::Reduce && t.inputs.is_empty()),
            TaskStatus::InProgress => t.lease_expired(now, timeout),
            TaskStatus::Done => false,
        })?;

        if self.tasks(phase)[index].status == TaskStatus::InProgress {
            self.expire_lease(phase, index, worker_id);
        }

        let n_reduce = self.n_reduce;
        let task = &mut self.tasks_mut(phase)[index];
        task.status = TaskStatus::InProgress;
        task.owner = Some(worker_id.to_string());
        task.assigned_at = Some(now);
        task.attempts += 1;
        let attempt = task.attempts;

        let assignment = match phase {
            TaskPhase::Map => TaskAssignment::Map {
                source: task.inputs[0].clone(),
                index,
                n_reduce,
            },
            TaskPhase::Reduce => TaskAssignment::Reduce {
                inputs: task.inputs.clone(),
                index,
                n_reduce,
            },
        };

        if let Some(meta) = self.workers.get_mut(worker_id) {
            meta.tasks_assigned += 1;
        }
        info!(
            "asignando tarea {} {} a worker {} (intento {})",
            phase, index, worker_id, attempt
        );
        Some(assignment)
    }

    /// El lease de la tarea venció y `caller` la va a tomar.
    fn expire_lease(&mut self, phase: TaskPhase, index: usize, caller: &str) {
        self.reassignments += 1;
        let previous = self.tasks(phase)[index].owner.clone();
        match previous {
            Some(prev) if prev != caller => {
                if let Some(meta) = self.workers.get_mut(&prev) {
                    meta.alive = false;
                }
                warn!(
                    "lease vencido en tarea {} {}: worker {} se da por caído, pasa a {}",
                    phase, index, prev, caller
                );
            }
            _ => debug!(
                "worker {} vuelve a tomar su propia tarea {} {} vencida",
                caller, phase, index
            ),
        }
    }

    /// Al terminar la fase map, los buckets sin entradas se cierran sin salida.
    fn cross_barrier(&mut self) {
        if self.barrier_crossed {
            return;
        }
        self.barrier_crossed = true;

        for (r, task) in self.reduce_tasks.iter_mut().enumerate() {
            if task.status == TaskStatus::Unassigned && task.inputs.is_empty() {
                task.status = TaskStatus::Done;
                self.reduce_skipped += 1;
                debug!("bucket reduce {} sin entradas, se omite", r);
            }
        }
        info!(
            "fase map terminada ({} tareas); empieza reduce ({} buckets omitidos)",
            self.map_tasks.len(),
            self.reduce_skipped
        );
    }

    fn touch(&mut self, worker_id: &str, now: Instant) {
        let meta = self.workers.entry(worker_id.to_string()).or_insert_with(|| {
            info!("nuevo worker {}", worker_id);
            WorkerMeta::new(now)
        });
        meta.alive = true;
        meta.last_contact = now;
    }

    /* ---------------- reportes ---------------- */

    fn check_worker(&mut self, worker_id: &str) -> Result<(), SchedulerError> {
        match self.workers.get_mut(worker_id) {
            Some(meta) => {
                meta.alive = true;
                meta.last_contact = Instant::now();
                Ok(())
            }
            None => Err(SchedulerError::UnknownWorker(worker_id.to_string())),
        }
    }

    /// Verifica que la tarea se haya asignado alguna vez. Un reporte de un
    /// dueño anterior se acepta igual, solo se registra.
    fn check_owner(
        &self,
        phase: TaskPhase,
        index: usize,
        worker_id: &str,
    ) -> Result<(), SchedulerError> {
        match &self.tasks(phase)[index].owner {
            None => Err(SchedulerError::NeverAssigned { phase, index }),
            Some(owner) if owner != worker_id => {
                warn!(
                    "reporte tardío de worker {} para la tarea {} {} (ahora es de {}); se acepta",
                    worker_id, phase, index, owner
                );
                Ok(())
            }
            Some(_) => Ok(()),
        }
    }

    fn check_reduce_index(&self, index: usize) -> Result<(), SchedulerError> {
        if index >= self.n_reduce {
            return Err(SchedulerError::ReduceIndexOutOfRange {
                index,
                n_reduce: self.n_reduce,
            });
        }
        Ok(())
    }

    /// Marca la tarea como terminada. Devuelve false si ya lo estaba.
    fn complete(&mut self, phase: TaskPhase, index: usize) -> bool {
        let task = &mut self.tasks_mut(phase)[index];
        if task.is_done() {
            debug!("tarea {} {} ya estaba terminada", phase, index);
            return false;
        }
        task.status = TaskStatus::Done;
        true
    }

    /// `ReportMapDone`: registra los intermedios de cada bucket.
    pub fn report_map_done(
        &mut self,
        worker_id: &str,
        task_name: &str,
        bucket_files: &[String],
    ) -> Result<(), SchedulerError> {
        self.check_worker(worker_id)?;
        let index = *self
            .map_index
            .get(task_name)
            .ok_or_else(|| SchedulerError::UnknownMapTask(task_name.to_string()))?;
        if bucket_files.len() > self.n_reduce {
            return Err(SchedulerError::TooManyBuckets {
                got: bucket_files.len(),
                n_reduce: self.n_reduce,
            });
        }
        self.check_owner(TaskPhase::Map, index, worker_id)?;

        let newly_done = self.complete(TaskPhase::Map, index);

        for (r, file) in bucket_files.iter().enumerate() {
            if file.is_empty() {
                continue;
            }
            let task = &mut self.reduce_tasks[r];
            if task.is_done() {
                debug!("bucket {} ya terminado, se ignora {}", r, file);
                continue;
            }
            if !task.inputs.iter().any(|f| f == file) {
                task.inputs.push(file.clone());
            }
        }

        if newly_done {
            if let Some(meta) = self.workers.get_mut(worker_id) {
                meta.tasks_completed += 1;
            }
            info!(
                "map {} ({}) terminado por worker {} [{}/{}]",
                index,
                task_name,
                worker_id,
                self.count_done(TaskPhase::Map),
                self.map_tasks.len()
            );
        }
        Ok(())
    }

    /// `ReportReduceDone`.
    pub fn report_reduce_done(&mut self, worker_id: &str, index: usize) -> Result<(), SchedulerError> {
        self.check_worker(worker_id)?;
        self.check_reduce_index(index)?;
        self.check_owner(TaskPhase::Reduce, index, worker_id)?;

        if self.complete(TaskPhase::Reduce, index) {
            if let Some(meta) = self.workers.get_mut(worker_id) {
                meta.tasks_completed += 1;
            }
            info!(
                "reduce {} terminado por worker {} [{}/{}]",
                index,
                worker_id,
                self.count_done(TaskPhase::Reduce),
                self.n_reduce
            );
        }
        self.mark_finished();
        Ok(())
    }

    /// `ReportTaskUnrunnable`: la tarea queda terminada sin salida y no se
    /// reintenta.
    pub fn report_unrunnable(
        &mut self,
        worker_id: &str,
        phase: TaskPhase,
        name: &str,
        index: usize,
    ) -> Result<(), SchedulerError> {
        self.check_worker(worker_id)?;
        let index = match phase {
            TaskPhase::Map => *self
                .map_index
                .get(name)
                .ok_or_else(|| SchedulerError::UnknownMapTask(name.to_string()))?,
            TaskPhase::Reduce => {
                self.check_reduce_index(index)?;
                index
            }
        };
        self.check_owner(phase, index, worker_id)?;

        if self.complete(phase, index) {
            match phase {
                TaskPhase::Map => self.map_unrunnable += 1,
                TaskPhase::Reduce => self.reduce_unrunnable += 1,
            }
            if let Some(meta) = self.workers.get_mut(worker_id) {
                meta.tasks_unrunnable += 1;
            }
            warn!(
                "tarea {} {} ({}) no ejecutable según worker {}; se da por terminada sin salida",
                phase, index, name, worker_id
            );
        }
        self.mark_finished();
        Ok(())
    }

    /* ---------------- consultas ---------------- */

    fn count_done(&self, phase: TaskPhase) -> usize {
        self.tasks(phase).iter().filter(|t| t.is_done()).count()
    }

    fn all_done(&self, phase: TaskPhase) -> bool {
        self.tasks(phase).iter().all(TaskInfo::is_done)
    }

    /// True cuando el job terminó: todas las map y todas las reduce (las
    /// que no tienen entradas cuentan como terminadas una vez cerrado map).
    pub fn done(&self) -> bool {
        self.all_done(TaskPhase::Map)
            && self
                .reduce_tasks
                .iter()
                .all(|t| t.is_done() || (t.status == TaskStatus::Unassigned && t.inputs.is_empty()))
    }

    fn mark_finished(&mut self) {
        if self.finished_at.is_none() && self.done() {
            self.finished_at = Some(Utc::now());
            info!(
                "job terminado: {} map, {} reduce, {} reasignaciones",
                self.map_tasks.len(),
                self.n_reduce,
                self.reassignments
            );
        }
    }

    /// Tareas en curso cuyo lease ya venció, con su dueño actual.
    pub fn overdue_tasks(&self, now: Instant) -> Vec<(TaskPhase, usize, WorkerId)> {
        let mut out = Vec::new();
        for phase in [TaskPhase::Map, TaskPhase::Reduce] {
            for (i, t) in self.tasks(phase).iter().enumerate() {
                if t.status == TaskStatus::InProgress && t.lease_expired(now, self.timeout) {
                    out.push((phase, i, t.owner.clone().unwrap_or_default()));
                }
            }
        }
        out
    }

    pub fn job_info(&self) -> JobInfo {
        let done = self.done();
        let status = if done {
            JobStatus::Finished
        } else if self.all_done(TaskPhase::Map) {
            JobStatus::Reducing
        } else {
            JobStatus::Mapping
        };
        JobInfo {
            status,
            n_map: self.map_tasks.len(),
            n_reduce: self.n_reduce,
            map_done: self.count_done(TaskPhase::Map),
            reduce_done: self.count_done(TaskPhase::Reduce),
            map_unrunnable: self.map_unrunnable,
            reduce_unrunnable: self.reduce_unrunnable,
            reduce_skipped: self.reduce_skipped,
            reassignments: self.reassignments,
            started_at: self.started_at,
            finished_at: self.finished_at,
            done,
        }
    }

    fn current_task_of(&self, worker_id: &str) -> Option<String> {
        for phase in [TaskPhase::Map, TaskPhase::Reduce] {
            for (i, t) in self.tasks(phase).iter().enumerate() {
                if t.status == TaskStatus::InProgress && t.owner.as_deref() == Some(worker_id) {
                    return Some(format!("{} {}", phase, i));
                }
            }
        }
        None
    }

    pub fn worker_metrics(&self, now: Instant) -> Vec<WorkerMetrics> {
        let mut out: Vec<WorkerMetrics> = self
            .workers
            .iter()
            .map(|(id, meta)| {
                WorkerMetrics {
                    worker_id: id.clone(),
                    alive: meta.alive,
                    first_contact_secs_ago: now.saturating_duration_since(meta.first_contact).as_secs(),
                    last_contact_secs_ago: now.saturating_duration_since(meta.last_contact).as_secs(),
                    tasks_assigned: meta.tasks_assigned,
                    tasks_completed: meta.tasks_completed,
                    tasks_unrunnable: meta.tasks_unrunnable,
                    current_task: self.current_task_of(id),
                }
            })
            .collect();
        out.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(10);

    fn files(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("pg-{}.txt", i)).collect()
    }

    fn scheduler(n_map: usize, n_reduce: usize) -> Scheduler {
        Scheduler::new(files(n_map), n_reduce, LEASE).unwrap()
    }

    fn map_index(a: &TaskAssignment) -> usize {
        match a {
            TaskAssignment::Map { index, .. } => *index,
            other => panic!("esperaba map, llegó {:?}", other),
        }
    }

    fn buckets(n_reduce: usize, map: usize) -> Vec<String> {
        (0..n_reduce).map(|r| format!("mr-{}-{}", map, r)).collect()
    }

    #[test]
    fn rechaza_configuraciones_invalidas() {
        assert_eq!(
            Scheduler::new(files(1), 0, LEASE).err(),
            Some(SchedulerError::NoReduceTasks)
        );
        let dup = vec!["a.txt".to_string(), "a.txt".to_string()];
        assert_eq!(
            Scheduler::new(dup, 1, LEASE).err(),
            Some(SchedulerError::DuplicateInput("a.txt".into()))
        );
    }

    #[test]
    fn asigna_maps_en_orden_y_luego_espera() {
        let mut s = scheduler(2, 3);
        let t0 = Instant::now();

        assert_eq!(
            s.assign_task_at("w1", t0),
            TaskAssignment::Map {
                source: "pg-0.txt".into(),
                index: 0,
                n_reduce: 3
            }
        );
        assert_eq!(map_index(&s.assign_task_at("w2", t0)), 1);
        assert_eq!(s.assign_task_at("w3", t0), TaskAssignment::Wait);
        assert!(!s.done());
    }

    #[test]
    fn barrera_no_entrega_reduce_con_maps_pendientes() {
        let mut s = scheduler(2, 2);
        let t0 = Instant::now();
        s.assign_task_at("w1", t0);
        s.assign_task_at("w2", t0);
        s.report_map_done("w1", "pg-0.txt", &buckets(2, 0)).unwrap();

        // map 1 sigue en curso: nadie recibe reduce aunque haya entradas
        assert_eq!(s.assign_task_at("w1", t0), TaskAssignment::Wait);

        s.report_map_done("w2", "pg-1.txt", &buckets(2, 1)).unwrap();
        assert_eq!(
            s.assign_task_at("w1", t0),
            TaskAssignment::Reduce {
                inputs: vec!["mr-0-0".into(), "mr-1-0".into()],
                index: 0,
                n_reduce: 2
            }
        );
    }

    #[test]
    fn flujo_completo_termina_en_exit() {
        let mut s = scheduler(1, 2);
        let t0 = Instant::now();
        s.assign_task_at("w", t0);
        s.report_map_done("w", "pg-0.txt", &buckets(2, 0)).unwrap();
        assert!(matches!(s.assign_task_at("w", t0), TaskAssignment::Reduce { index: 0, .. }));
        assert!(matches!(s.assign_task_at("w", t0), TaskAssignment::Reduce { index: 1, .. }));

        // reduce 1 en curso: exit recién cuando terminan todas
        s.report_reduce_done("w", 0).unwrap();
        assert_eq!(s.assign_task_at("w", t0), TaskAssignment::Wait);
        s.report_reduce_done("w", 1).unwrap();

        assert!(s.done());
        assert_eq!(s.assign_task_at("w", t0), TaskAssignment::Exit);
        let info = s.job_info();
        assert_eq!(info.status, JobStatus::Finished);
        assert!(info.finished_at.is_some());
    }

    #[test]
    fn lease_vencido_reasigna_y_marca_caido_al_dueno_anterior() {
        let mut s = scheduler(1, 1);
        let t0 = Instant::now();
        assert_eq!(map_index(&s.assign_task_at("lento", t0)), 0);

        // dentro del lease: espera
        assert_eq!(s.assign_task_at("rapido", t0 + LEASE / 2), TaskAssignment::Wait);

        // vencido: se reasigna
        assert_eq!(map_index(&s.assign_task_at("rapido", t0 + LEASE)), 0);
        assert!(!s.worker("lento").unwrap().alive);
        assert!(s.worker("rapido").unwrap().alive);
        let task = s.task(TaskPhase::Map, 0).unwrap();
        assert_eq!(task.owner.as_deref(), Some("rapido"));
        assert_eq!(task.attempts, 2);
        assert_eq!(s.job_info().reassignments, 1);
    }

    #[test]
    fn retomar_la_propia_tarea_no_penaliza() {
        let mut s = scheduler(1, 1);
        let t0 = Instant::now();
        s.assign_task_at("w", t0);
        assert_eq!(map_index(&s.assign_task_at("w", t0 + LEASE * 2)), 0);
        assert!(s.worker("w").unwrap().alive);
    }

    #[test]
    fn reporte_tardio_se_acepta_y_no_duplica_entradas() {
        let mut s = scheduler(1, 2);
        let t0 = Instant::now();
        s.assign_task_at("lento", t0);
        s.assign_task_at("rapido", t0 + LEASE);

        s.report_map_done("rapido", "pg-0.txt", &buckets(2, 0)).unwrap();
        s.report_map_done("lento", "pg-0.txt", &buckets(2, 0)).unwrap();

        assert_eq!(s.task(TaskPhase::Map, 0).unwrap().status, TaskStatus::Done);
        assert_eq!(s.task(TaskPhase::Reduce, 0).unwrap().inputs, vec!["mr-0-0"]);
        assert_eq!(s.worker("rapido").unwrap().tasks_completed, 1);
        // el reporte tardío cuenta como contacto
        assert!(s.worker("lento").unwrap().alive);
    }

    #[test]
    fn estado_nunca_retrocede() {
        let mut s = scheduler(1, 1);
        let t0 = Instant::now();
        s.assign_task_at("w", t0);
        s.report_map_done("w", "pg-0.txt", &buckets(1, 0)).unwrap();
        s.report_unrunnable("w", TaskPhase::Map, "pg-0.txt", 0).unwrap();

        assert_eq!(s.task(TaskPhase::Map, 0).unwrap().status, TaskStatus::Done);
        assert_eq!(s.job_info().map_unrunnable, 0);
        // mucho después, la map terminada no vuelve a entregarse
        assert!(matches!(
            s.assign_task_at("w", t0 + LEASE * 5),
            TaskAssignment::Reduce { index: 0, .. }
        ));
    }

    #[test]
    fn buckets_vacios_se_omiten_al_cruzar_la_barrera() {
        let mut s = scheduler(2, 3);
        let t0 = Instant::now();
        s.assign_task_at("w", t0);
        s.assign_task_at("w", t0);
        s.report_map_done("w", "pg-0.txt", &["mr-0-0".into(), String::new(), String::new()])
            .unwrap();
        s.report_map_done("w", "pg-1.txt", &[String::new(), String::new(), String::new()])
            .unwrap();

        assert!(matches!(s.assign_task_at("w", t0), TaskAssignment::Reduce { index: 0, .. }));
        assert_eq!(s.task(TaskPhase::Reduce, 1).unwrap().status, TaskStatus::Done);
        assert_eq!(s.task(TaskPhase::Reduce, 2).unwrap().status, TaskStatus::Done);
        assert_eq!(s.job_info().reduce_skipped, 2);

        s.report_reduce_done("w", 0).unwrap();
        assert!(s.done());
    }

    #[test]
    fn job_sin_entradas_termina_enseguida() {
        let mut s = scheduler(0, 2);
        assert!(s.done());
        assert_eq!(s.assign_task_at("w", Instant::now()), TaskAssignment::Exit);
    }

    #[test]
    fn tarea_no_ejecutable_cuenta_como_terminada() {
        let mut s = scheduler(2, 1);
        let t0 = Instant::now();
        s.assign_task_at("w", t0);
        s.assign_task_at("w", t0);
        s.report_unrunnable("w", TaskPhase::Map, "pg-0.txt", 0).unwrap();
        s.report_map_done("w", "pg-1.txt", &buckets(1, 1)).unwrap();

        assert!(matches!(s.assign_task_at("w", t0), TaskAssignment::Reduce { index: 0, .. }));
        s.report_unrunnable("w", TaskPhase::Reduce, "", 0).unwrap();

        let info = s.job_info();
        assert!(info.done);
        assert_eq!(info.map_unrunnable, 1);
        assert_eq!(info.reduce_unrunnable, 1);
        assert_eq!(s.worker("w").unwrap().tasks_unrunnable, 2);
    }

    #[test]
    fn violaciones_de_protocolo_son_errores() {
        let mut s = scheduler(1, 2);
        assert_eq!(
            s.report_reduce_done("fantasma", 0),
            Err(SchedulerError::UnknownWorker("fantasma".into()))
        );

        s.assign_task_at("w", Instant::now());
        assert_eq!(
            s.report_map_done("w", "otro.txt", &[]),
            Err(SchedulerError::UnknownMapTask("otro.txt".into()))
        );
        assert_eq!(
            s.report_reduce_done("w", 2),
            Err(SchedulerError::ReduceIndexOutOfRange { index: 2, n_reduce: 2 })
        );
        assert_eq!(
            s.report_reduce_done("w", 1),
            Err(SchedulerError::NeverAssigned {
                phase: TaskPhase::Reduce,
                index: 1
            })
        );
        assert_eq!(
            s.report_map_done("w", "pg-0.txt", &buckets(3, 0)),
            Err(SchedulerError::TooManyBuckets { got: 3, n_reduce: 2 })
        );
    }

    #[test]
    fn tareas_vencidas_y_metricas_de_workers() {
        let mut s = scheduler(2, 1);
        let t0 = Instant::now();
        s.assign_task_at("a", t0);
        s.assign_task_at("b", t0);
        s.report_map_done("b", "pg-1.txt", &[]).unwrap();

        assert!(s.overdue_tasks(t0).is_empty());
        assert_eq!(s.overdue_tasks(t0 + LEASE), vec![(TaskPhase::Map, 0, "a".to_string())]);

        let metrics = s.worker_metrics(t0);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].worker_id, "a");
        assert_eq!(metrics[0].current_task.as_deref(), Some("map 0"));
        assert_eq!(metrics[1].current_task, None);
        assert_eq!(metrics[1].tasks_completed, 1);

        // el primer contacto no se mueve con los contactos siguientes
        s.assign_task_at("a", t0 + Duration::from_secs(3));
        let later = s.worker_metrics(t0 + Duration::from_secs(5));
        assert_eq!(later[0].first_contact_secs_ago, 5);
        assert_eq!(later[0].last_contact_secs_ago, 2);
    }
}
