//! 相机指标收集模块
//!
//! 生产循环、广播信号与消费者的运行指标。
//! 未安装 recorder 时，`metrics` 宏为空操作，因此测试中可直接调用。

use contracts::FaultKind;
use metrics::{counter, gauge, histogram};

/// 记录一次帧发布
pub fn record_frame_published(source_id: &str, generation: u64) {
    counter!(
        "overlay_streamer_frames_published_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);

    gauge!(
        "overlay_streamer_last_generation",
        "source_id" => source_id.to_string()
    )
    .set(generation as f64);
}

/// 记录被回收的失效消费者
pub fn record_consumers_reaped(source_id: &str, count: usize) {
    if count == 0 {
        return;
    }
    counter!(
        "overlay_streamer_consumers_reaped_total",
        "source_id" => source_id.to_string()
    )
    .increment(count as u64);
}

/// 记录当前消费者槽位数
pub fn record_active_consumers(source_id: &str, count: usize) {
    gauge!(
        "overlay_streamer_active_consumers",
        "source_id" => source_id.to_string()
    )
    .set(count as f64);
}

/// 记录生产线程启动
pub fn record_producer_started(source_id: &str) {
    counter!(
        "overlay_streamer_producer_starts_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
    gauge!(
        "overlay_streamer_producer_running",
        "source_id" => source_id.to_string()
    )
    .set(1.0);
}

/// 记录生产线程退出及原因
pub fn record_producer_stopped(source_id: &str, reason: &str) {
    counter!(
        "overlay_streamer_producer_stops_total",
        "source_id" => source_id.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
    gauge!(
        "overlay_streamer_producer_running",
        "source_id" => source_id.to_string()
    )
    .set(0.0);
}

/// 记录故障（按类型分类）
pub fn record_fault(source_id: &str, kind: FaultKind) {
    counter!(
        "overlay_streamer_faults_total",
        "source_id" => source_id.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// 记录帧从产生到被消费者取走的延迟
pub fn record_frame_latency_ms(source_id: &str, latency_ms: f64) {
    histogram!(
        "overlay_streamer_frame_latency_ms",
        "source_id" => source_id.to_string()
    )
    .record(latency_ms);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 合并另一组统计 (Chan et al. 并行算法)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.m2 += other.m2 + delta * delta * (self.count as f64 * other.count as f64) / count as f64;
        self.mean += delta * other.count as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
