//! 计数轮询器
//!
//! 固定间隔读取一次计数器存储并上报：成功打印一行采样并更新指标，
//! 失败静默跳过本次采样。纯观测循环，不持锁、不修改内核状态，
//! 不会阻塞挂载管理器或停机协调。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus::IntGauge;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tcwatch_common::{CounterSample, CounterStore};

/// 计数轮询器
pub struct CounterPoller {
    /// 计数器存储（加载器拥有，此处只读借用）
    store: Arc<dyn CounterStore>,
    /// 轮询间隔
    interval: Duration,
    /// 共享的终止标志，由停机流程置位
    stop: Arc<AtomicBool>,
    /// 可选的导出指标
    gauge: Option<IntGauge>,
    /// 最近一次成功采样的发布端
    latest: watch::Sender<Option<CounterSample>>,
}

impl CounterPoller {
    /// 创建新的轮询器
    pub fn new(store: Arc<dyn CounterStore>, interval: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            store,
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            gauge: None,
            latest,
        }
    }

    /// 订阅最近一次成功采样；读取失败的 tick 不更新该值
    pub fn subscribe(&self) -> watch::Receiver<Option<CounterSample>> {
        self.latest.subscribe()
    }

    /// 附加导出指标
    pub fn with_gauge(mut self, gauge: IntGauge) -> Self {
        self.gauge = Some(gauge);
        self
    }

    /// 终止标志句柄
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// 执行一次采样
    ///
    /// 读取失败时返回 None 且不中断后续轮询。
    pub fn poll_once(&self) -> Option<CounterSample> {
        match self.store.read() {
            Ok(sample) => {
                info!("通过的数据包: {}", sample.packets);
                if let Some(gauge) = &self.gauge {
                    gauge.set(i64::try_from(sample.packets).unwrap_or(i64::MAX));
                }
                self.latest.send_replace(Some(sample));
                Some(sample)
            }
            Err(e) => {
                debug!("本次采样跳过: {}", e);
                None
            }
        }
    }

    /// 启动后台轮询任务，运行至终止标志置位
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                if self.stop.load(Ordering::Relaxed) {
                    break;
                }
                self.poll_once();
            }
            debug!("计数轮询结束");
        })
    }
}
