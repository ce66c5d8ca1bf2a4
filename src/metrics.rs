use serde::Serialize;

/// Flush counters accumulated by one `TouchContext`
#[derive(Debug, Default, Clone)]
pub(crate) struct FlushMetrics {
    /// Completed flushes (outermost scope exits with pending touches)
    flushes: u64,
    /// Total passes across all flushes
    passes: u64,
    /// Maximum passes seen in any single flush
    max_passes: usize,
    /// Update statements issued
    statements: u64,
    /// Rows the store reported as affected
    rows_affected: u64,
    /// Records whose timestamps were written
    records_touched: u64,
    /// Post-touch callbacks run
    callbacks_run: u64,
    /// Touches discarded (failed pass, pass limit, panic unwinding)
    touches_discarded: u64,
    /// Total flush time (nanoseconds)
    total_timing_ns: u128,
}

impl FlushMetrics {
    /// Record the start of a flush
    pub fn record_flush_start() -> FlushTimer {
        FlushTimer::new()
    }

    /// Record completion of a flush
    pub fn record_flush_complete(&mut self, pass_count: usize, timer: FlushTimer) {
        self.flushes += 1;
        self.passes += pass_count as u64;
        self.max_passes = self.max_passes.max(pass_count);
        self.total_timing_ns += timer.elapsed_ns();
    }

    pub fn record_statement(&mut self, rows_affected: u64) {
        self.statements += 1;
        self.rows_affected += rows_affected;
    }

    pub fn record_touched(&mut self, records: usize) {
        self.records_touched += records as u64;
    }

    pub fn record_callback(&mut self) {
        self.callbacks_run += 1;
    }

    pub fn record_discarded(&mut self, touches: usize) {
        self.touches_discarded += touches as u64;
    }

    pub fn snapshot(&self, queue_size: usize) -> TouchStats {
        TouchStats {
            queue_size,
            flushes: self.flushes,
            passes: self.passes,
            max_passes: self.max_passes,
            statements: self.statements,
            rows_affected: self.rows_affected,
            records_touched: self.records_touched,
            callbacks_run: self.callbacks_run,
            touches_discarded: self.touches_discarded,
            total_timing_ns: self.total_timing_ns,
        }
    }
}

/// Timer for measuring flush duration
pub(crate) struct FlushTimer {
    start: std::time::Instant,
}

impl FlushTimer {
    fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    fn elapsed_ns(&self) -> u128 {
        self.start.elapsed().as_nanos()
    }
}

/// Statistics returned by `TouchContext::stats`
#[derive(Debug, Clone, Serialize)]
pub struct TouchStats {
    pub queue_size: usize,
    pub flushes: u64,
    pub passes: u64,
    pub max_passes: usize,
    pub statements: u64,
    pub rows_affected: u64,
    pub records_touched: u64,
    pub callbacks_run: u64,
    pub touches_discarded: u64,
    pub total_timing_ns: u128,
}

impl TouchStats {
    /// Convert timing to milliseconds
    pub fn total_timing_ms(&self) -> f64 {
        self.total_timing_ns as f64 / 1_000_000.0
    }

    /// Average records written per statement (how much batching saved)
    pub fn records_per_statement(&self) -> f64 {
        if self.statements == 0 {
            0.0
        } else {
            self.records_touched as f64 / self.statements as f64
        }
    }

    pub fn to_json(&self) -> crate::TouchResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
