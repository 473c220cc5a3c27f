//! Time-based system metrics read from procfs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use deskstat_core::{StatusValue, Unit};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::Emitter;

pub const CPU_PERCENT_TAG: &str = "CpuPercent";
pub const CPU_FREQ_TAG: &str = "CpuFreq";
pub const LOADAVG_TAG: &str = "LoadAvg";
pub const MEM_PERCENT_TAG: &str = "MemPercent";
pub const SWAP_USED_TAG: &str = "SwapUsed";
pub const NET_DEVICE_TAG: &str = "NetDevice";
pub const DOWN_SPEED_TAG: &str = "DownSpeed";
pub const DOWN_TOTAL_TAG: &str = "DownTotal";
pub const UP_SPEED_TAG: &str = "UpSpeed";
pub const UP_TOTAL_TAG: &str = "UpTotal";

/// The kernel refreshes load averages every 5 seconds.
const LOADAVG_EVERY: u64 = 5;

const KIB: f64 = 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Source of time-based statuses. Each call to [`poll`](Self::poll) returns
/// only the values that changed since the previous call.
pub trait ResourceProvider: Send + 'static {
    /// Values registered on the bus before the first tick.
    fn initial_statuses(&self) -> Vec<StatusValue>;

    /// Sample for tick `elapsed` (0 at startup).
    fn poll(&mut self, elapsed: u64) -> Vec<StatusValue>;
}

/// Which procfs files to watch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceSet {
    /// `/proc/stat`: CPU usage.
    pub stat: bool,
    /// `/proc/cpuinfo`: mean core frequency.
    pub cpuinfo: bool,
    pub loadavg: bool,
    pub meminfo: bool,
    /// `/proc/net/dev`: busiest interface, its rates and totals.
    pub netdev: bool,
}

impl ResourceSet {
    pub fn all() -> Self {
        Self {
            stat: true,
            cpuinfo: true,
            loadavg: true,
            meminfo: true,
            netdev: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ─── procfs parsing ───────────────────────────────────────────────

/// Aggregate CPU jiffies from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Busy share of the time between `prev` and `self`, in percent.
    pub fn percent_since(&self, prev: &CpuTimes) -> Option<i64> {
        let total = self.total.checked_sub(prev.total)?;
        if total == 0 {
            return None;
        }
        let busy = self.busy.saturating_sub(prev.busy);
        Some((busy as f64 * 100.0 / total as f64).round() as i64)
    }
}

/// user, nice, system, idle, iowait, irq, softirq, steal. Guest time is
/// already counted in user and nice.
pub fn parse_stat(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Mean of every `cpu MHz` line of `/proc/cpuinfo`.
pub fn parse_cpuinfo(content: &str) -> Option<f64> {
    let mhz: Vec<f64> = content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == "cpu MHz").then(|| value.trim().parse().ok())?
        })
        .collect();
    if mhz.is_empty() {
        return None;
    }
    Some(mhz.iter().sum::<f64>() / mhz.len() as f64)
}

/// One-minute load average from `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
}

impl MemInfo {
    pub fn used_percent(&self) -> i64 {
        if self.total_kb == 0 {
            return 0;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        (used as f64 * 100.0 / self.total_kb as f64).round() as i64
    }

    pub fn swap_used_mb(&self) -> i64 {
        (self.swap_total_kb.saturating_sub(self.swap_free_kb) / 1024) as i64
    }
}

/// Memory and swap totals from `/proc/meminfo`. Missing swap lines count as
/// no swap; missing memory lines are an error.
pub fn parse_meminfo(content: &str) -> Option<MemInfo> {
    let mut fields: BTreeMap<&str, u64> = BTreeMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        if let Some(kb) = rest.split_whitespace().next().and_then(|v| v.parse().ok()) {
            fields.insert(key.trim(), kb);
        }
    }
    Some(MemInfo {
        total_kb: *fields.get("MemTotal")?,
        available_kb: *fields.get("MemAvailable")?,
        swap_total_kb: fields.get("SwapTotal").copied().unwrap_or(0),
        swap_free_kb: fields.get("SwapFree").copied().unwrap_or(0),
    })
}

/// Byte counters of one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetCounters {
    pub device: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// The non-loopback interface with the most traffic in `/proc/net/dev`.
pub fn parse_netdev(content: &str) -> Option<NetCounters> {
    content
        .lines()
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() || name == "lo" {
                return None;
            }
            let fields: Vec<&str> = rest.split_whitespace().collect();
            Some(NetCounters {
                device: name.to_string(),
                rx_bytes: fields.first()?.parse().ok()?,
                tx_bytes: fields.get(8)?.parse().ok()?,
            })
        })
        .max_by_key(|c| c.rx_bytes.saturating_add(c.tx_bytes))
}

// ─── Status templates ─────────────────────────────────────────────

fn cpu_percent_status() -> StatusValue {
    StatusValue::new(CPU_PERCENT_TAG)
        .with_label("\u{f085} ")
        .with_value(0_i64)
        .with_format("{:>3}")
        .with_unit(Unit::new(1.0, "%"))
}

fn cpu_freq_status() -> StatusValue {
    StatusValue::new(CPU_FREQ_TAG)
        .with_label("\u{f0e4} ")
        .with_value(0.0)
        .with_format("{:.1}")
        .with_unit(Unit::new(1000.0, "G"))
}

fn loadavg_status() -> StatusValue {
    StatusValue::new(LOADAVG_TAG)
        .with_label("\u{f2db} ")
        .with_value(0.0)
        .with_format("{:.2}")
}

fn mem_percent_status() -> StatusValue {
    StatusValue::new(MEM_PERCENT_TAG)
        .with_label("\u{f538} ")
        .with_value(0_i64)
        .with_format("{:>3}")
        .with_unit(Unit::new(1.0, "%"))
}

fn swap_used_status() -> StatusValue {
    StatusValue::new(SWAP_USED_TAG)
        .with_label("\u{f0ec} ")
        .with_value(0_i64)
        .with_format("{:.1}")
        .with_unit(Unit::new(1024.0, "G"))
}

fn net_device_status() -> StatusValue {
    StatusValue::new(NET_DEVICE_TAG)
        .with_label("\u{f6ff} ")
        .with_value("-")
}

fn speed_status(tag: &str, label: &str) -> StatusValue {
    StatusValue::new(tag)
        .with_label(label)
        .with_value(0_i64)
        .with_format("{:>6.1}")
        .with_unit(Unit::new(KIB, "K"))
}

fn total_status(tag: &str, label: &str) -> StatusValue {
    StatusValue::new(tag)
        .with_label(label)
        .with_value(0_i64)
        .with_format("{:.2}")
        .with_unit(Unit::new(GIB, "G"))
}

const DOWN_LABEL: &str = "\u{f063} ";
const UP_LABEL: &str = "\u{f062} ";

fn initial_statuses(set: ResourceSet) -> Vec<StatusValue> {
    let mut out = Vec::new();
    if set.stat {
        out.push(cpu_percent_status());
    }
    if set.cpuinfo {
        out.push(cpu_freq_status());
    }
    if set.loadavg {
        out.push(loadavg_status());
    }
    if set.meminfo {
        out.push(mem_percent_status());
        out.push(swap_used_status());
    }
    if set.netdev {
        out.push(net_device_status());
        out.push(speed_status(DOWN_SPEED_TAG, DOWN_LABEL));
        out.push(total_status(DOWN_TOTAL_TAG, DOWN_LABEL));
        out.push(speed_status(UP_SPEED_TAG, UP_LABEL));
        out.push(total_status(UP_TOTAL_TAG, UP_LABEL));
    }
    out
}

// ─── ProcResources ────────────────────────────────────────────────

/// Reads the selected procfs files once per tick. CPU usage and network
/// rates are deltas, so they first appear on the second sample.
pub struct ProcResources {
    root: PathBuf,
    set: ResourceSet,
    tick: Duration,
    prev_cpu: Option<CpuTimes>,
    prev_net: Option<NetCounters>,
    last: BTreeMap<String, StatusValue>,
}

impl ProcResources {
    pub fn new(set: ResourceSet, tick: Duration) -> Self {
        Self::with_root("/proc", set, tick)
    }

    /// Read from `root` instead of `/proc`.
    pub fn with_root(root: impl Into<PathBuf>, set: ResourceSet, tick: Duration) -> Self {
        Self {
            root: root.into(),
            set,
            tick,
            prev_cpu: None,
            prev_net: None,
            last: initial_statuses(set)
                .into_iter()
                .map(|s| (s.tag.clone(), s))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    fn read(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read resource");
                None
            }
        }
    }

    /// Keep `status` if it differs from the last value of its tag.
    fn changed(&mut self, status: StatusValue) -> Option<StatusValue> {
        match self.last.get(&status.tag) {
            Some(prev) if !prev.differs_from(&status) => None,
            _ => {
                self.last.insert(status.tag.clone(), status.clone());
                Some(status)
            }
        }
    }

    /// Bytes per second between two samples one tick apart.
    fn rate(&self, prev: u64, current: u64) -> i64 {
        let secs = self.tick.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (current.saturating_sub(prev) as f64 / secs).round() as i64
    }

    fn sample_net(&mut self, out: &mut Vec<StatusValue>) {
        let Some(net) = self.read("net/dev").as_deref().and_then(parse_netdev) else {
            return;
        };
        out.push(net_device_status().with_value(net.device.as_str()));
        out.push(total_status(DOWN_TOTAL_TAG, DOWN_LABEL).with_value(net.rx_bytes as i64));
        out.push(total_status(UP_TOTAL_TAG, UP_LABEL).with_value(net.tx_bytes as i64));
        // Rates need two samples of the same interface.
        if let Some(prev) = self.prev_net.as_ref().filter(|p| p.device == net.device) {
            let down = self.rate(prev.rx_bytes, net.rx_bytes);
            let up = self.rate(prev.tx_bytes, net.tx_bytes);
            out.push(speed_status(DOWN_SPEED_TAG, DOWN_LABEL).with_value(down));
            out.push(speed_status(UP_SPEED_TAG, UP_LABEL).with_value(up));
        }
        self.prev_net = Some(net);
    }

    fn sample(&mut self, elapsed: u64) -> Vec<StatusValue> {
        let mut out = Vec::new();
        if self.set.stat {
            if let Some(cpu) = self.read("stat").as_deref().and_then(parse_stat) {
                if let Some(percent) = self.prev_cpu.and_then(|prev| cpu.percent_since(&prev)) {
                    out.push(cpu_percent_status().with_value(percent));
                }
                self.prev_cpu = Some(cpu);
            }
        }
        if self.set.cpuinfo {
            if let Some(mhz) = self.read("cpuinfo").as_deref().and_then(parse_cpuinfo) {
                out.push(cpu_freq_status().with_value(mhz));
            }
        }
        if self.set.loadavg && elapsed % LOADAVG_EVERY == 0 {
            if let Some(load) = self.read("loadavg").as_deref().and_then(parse_loadavg) {
                out.push(loadavg_status().with_value(load));
            }
        }
        if self.set.meminfo {
            if let Some(mem) = self.read("meminfo").as_deref().and_then(parse_meminfo) {
                out.push(mem_percent_status().with_value(mem.used_percent()));
                out.push(swap_used_status().with_value(mem.swap_used_mb()));
            }
        }
        if self.set.netdev {
            self.sample_net(&mut out);
        }
        out
    }
}

impl ResourceProvider for ProcResources {
    fn initial_statuses(&self) -> Vec<StatusValue> {
        self.last.values().cloned().collect()
    }

    fn poll(&mut self, elapsed: u64) -> Vec<StatusValue> {
        self.sample(elapsed)
            .into_iter()
            .filter_map(|status| self.changed(status))
            .collect()
    }
}

// ─── Ticker ───────────────────────────────────────────────────────

/// Poll `provider` once at startup (tick 0), then every `period` with an
/// increasing tick counter, until cancelled.
pub async fn run_ticker<R: ResourceProvider>(
    mut provider: R,
    period: Duration,
    emitter: Emitter,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut elapsed = 0;
    loop {
        for status in provider.poll(elapsed) {
            if !emitter.emit(status).await {
                return;
            }
        }
        elapsed += 1;

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
    }
}
