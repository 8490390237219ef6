// Shared test helpers: scripted counter source and sink

#![allow(dead_code)]

use hostreport::builder::{BuilderConfig, SnapshotBuilder};
use hostreport::counters::CounterSource;
use hostreport::error::{CounterError, SinkError};
use hostreport::models::*;
use hostreport::sink::TelemetrySink;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn raw(at: Instant, user: u64, idle: u64, sent: u64, recv: u64, packets: u64) -> RawSample {
    RawSample {
        cpu: CpuTimes {
            user,
            idle,
            ..Default::default()
        },
        net: NetCounters {
            bytes_sent: sent,
            bytes_recv: recv,
            packets_sent: packets,
        },
        taken_at: at,
    }
}

pub fn unavailable(counter: &'static str) -> CounterError {
    CounterError::new(counter, "permission denied")
}

pub struct FakeState {
    /// Popped one per `sample()`; an empty script reads as unavailable.
    pub samples: VecDeque<Result<RawSample, CounterError>>,
    pub memory: Result<MemoryReading, CounterError>,
    pub process_count: Result<u64, CounterError>,
    pub uptime: Result<u64, CounterError>,
    pub identity: Result<CpuIdentity, CounterError>,
    pub disks: Result<Vec<DiskReading>, CounterError>,
    pub static_info_calls: usize,
    pub disk_list_calls: usize,
    /// Next `sample()` panics instead of answering.
    pub panic_on_sample: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            samples: VecDeque::new(),
            memory: Ok(MemoryReading {
                mem_total: 8 * 1024 * 1024 * 1024,
                mem_used: 2 * 1024 * 1024 * 1024,
                swap_total: 0,
                swap_used: 0,
            }),
            process_count: Ok(123),
            uptime: Ok(90_061),
            identity: Ok(CpuIdentity {
                model: "Fake CPU @ 3.00GHz".into(),
                count: 4,
                freq_ghz: Some(3.0),
            }),
            disks: Ok(vec![DiskReading {
                mount: "/".into(),
                fs_type: "ext4".into(),
                total: 100 * 1024 * 1024 * 1024,
                used: 25 * 1024 * 1024 * 1024,
            }]),
            static_info_calls: 0,
            disk_list_calls: 0,
            panic_on_sample: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeSource {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    pub fn with_samples(samples: Vec<Result<RawSample, CounterError>>) -> Self {
        let source = Self::default();
        source.state.lock().unwrap().samples = samples.into();
        source
    }

    pub fn edit(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn static_info_calls(&self) -> usize {
        self.state.lock().unwrap().static_info_calls
    }

    pub fn disk_list_calls(&self) -> usize {
        self.state.lock().unwrap().disk_list_calls
    }
}

impl CounterSource for FakeSource {
    fn sample(&mut self) -> Result<RawSample, CounterError> {
        let mut s = self.state.lock().unwrap();
        if s.panic_on_sample {
            s.panic_on_sample = false;
            // release first so only the caller's lock is poisoned
            drop(s);
            panic!("counter source blew up");
        }
        s.samples
            .pop_front()
            .unwrap_or_else(|| Err(unavailable("cpu_times")))
    }

    fn memory(&mut self) -> Result<MemoryReading, CounterError> {
        self.state.lock().unwrap().memory.clone()
    }

    fn process_count(&mut self) -> Result<u64, CounterError> {
        self.state.lock().unwrap().process_count.clone()
    }

    fn uptime_secs(&mut self) -> Result<u64, CounterError> {
        self.state.lock().unwrap().uptime.clone()
    }

    fn static_info(&mut self) -> Result<CpuIdentity, CounterError> {
        let mut s = self.state.lock().unwrap();
        s.static_info_calls += 1;
        s.identity.clone()
    }

    fn disk_list(&mut self) -> Result<Vec<DiskReading>, CounterError> {
        let mut s = self.state.lock().unwrap();
        s.disk_list_calls += 1;
        s.disks.clone()
    }

    fn os_name(&mut self) -> String {
        "FakeOS 1.0".into()
    }
}

pub fn builder_config(disk_ttl: Duration) -> BuilderConfig {
    BuilderConfig {
        secret_key: "test-secret".into(),
        disk_ttl,
        utc_offset: chrono::FixedOffset::east_opt(8 * 3600).unwrap(),
    }
}

pub fn fake_builder(source: &FakeSource, disk_ttl: Duration) -> SnapshotBuilder {
    SnapshotBuilder::new(Box::new(source.clone()), builder_config(disk_ttl))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Transport,
    Reject(i64),
}

impl Reply {
    fn into_result(self) -> Result<(), SinkError> {
        match self {
            Reply::Accept => Ok(()),
            Reply::Transport => Err(SinkError::Transport("connection refused".into())),
            Reply::Reject(code) => Err(SinkError::Rejected {
                code,
                message: "invalid secret key".into(),
            }),
        }
    }
}

pub struct SinkState {
    pub script: Mutex<VecDeque<Reply>>,
    /// Used once the script runs out.
    pub otherwise: Reply,
    pub calls: AtomicUsize,
    pub received: Mutex<Vec<Snapshot>>,
}

#[derive(Clone)]
pub struct ScriptedSink {
    pub state: Arc<SinkState>,
}

impl ScriptedSink {
    pub fn new(script: Vec<Reply>, otherwise: Reply) -> Self {
        Self {
            state: Arc::new(SinkState {
                script: Mutex::new(script.into()),
                otherwise,
                calls: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

impl TelemetrySink for ScriptedSink {
    async fn send(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state.received.lock().unwrap().push(snapshot.clone());
        let reply = self
            .state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.state.otherwise);
        reply.into_result()
    }
}

pub fn sample_snapshot() -> Snapshot {
    Snapshot {
        cpu_usage: 12.5,
        cpu_model: "Fake CPU".into(),
        cpu_count: Some(4),
        cpu_freq: Some(3.0),
        mem_total: "8.0 GB".into(),
        mem_used: "2.0 GB".into(),
        mem_percent: Some(25.0),
        swap_total: "0 B".into(),
        swap_used: "0 B".into(),
        swap_percent: Some(0.0),
        network_sent: "1.0 MB".into(),
        network_received: "2.0 MB".into(),
        network_pocket_sent: Some(42),
        process_count: Some(123),
        disks: vec![DiskEntry(
            "/".into(),
            "100.0 GB".into(),
            "25.0 GB".into(),
            25.0,
        )],
        uptime: "1days 1hours 1minutes 1seconds".into(),
        sent_speed: "0.0 KB/s".into(),
        recv_speed: "0.0 KB/s".into(),
        os: "FakeOS 1.0".into(),
        secret_key: "test-secret".into(),
        last_update: "2025-01-01 08:00:00".into(),
    }
}
