//! 指标导出模块
//!
//! 该模块把轮询到的数据包计数通过 Prometheus 格式导出。
//! 计数值由内核分类器维护，这里只转述读到的绝对值。

use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use tracing::{error, info};

use tcwatch_common::{Error, Result};

/// 指标导出器
pub struct MetricsExporter {
    /// Prometheus 注册表
    registry: Registry,
    /// 通过分类器的数据包总数（内核计数的转述值）
    packets_total: IntGauge,
}

impl MetricsExporter {
    /// 创建新的导出器
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let packets_total = IntGauge::new(
            "tcwatch_packets_total",
            "Total number of packets observed by the classifier",
        )
        .map_err(|e| Error::Config(e.to_string()))?;

        registry
            .register(Box::new(packets_total.clone()))
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            registry,
            packets_total,
        })
    }

    /// 数据包计数指标（供轮询器更新）
    pub fn packets_gauge(&self) -> IntGauge {
        self.packets_total.clone()
    }

    /// 启动 HTTP 服务器提供 Prometheus 指标端点
    pub fn serve(&self, addr: SocketAddr) {
        let registry = self.registry.clone();

        let serve_future = async move {
            let make_svc = make_service_fn(move |_| {
                let registry = registry.clone();
                async move {
                    Ok::<_, Infallible>(service_fn(move |_: Request<Body>| {
                        let registry = registry.clone();
                        async move {
                            let encoder = TextEncoder::new();
                            let metric_families = registry.gather();
                            let mut buffer = vec![];
                            if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                                error!("指标编码失败: {}", e);
                            }

                            let response = Response::builder()
                                .status(200)
                                .header("Content-Type", encoder.format_type())
                                .body(Body::from(buffer))
                                .unwrap_or_else(|_| Response::new(Body::empty()));

                            Ok::<_, Infallible>(response)
                        }
                    }))
                }
            });

            info!("指标服务器启动在 {}", addr);

            if let Err(e) = Server::bind(&addr).serve(make_svc).await {
                error!("指标服务器错误: {}", e);
            }
        };

        tokio::spawn(serve_future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_is_registered() {
        let exporter = MetricsExporter::new().unwrap();
        exporter.packets_gauge().set(42);

        let families = exporter.registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "tcwatch_packets_total")
            .expect("指标应已注册");
        assert_eq!(family.get_metric()[0].get_gauge().get_value() as i64, 42);
    }

    #[test]
    fn test_gauge_clone_shares_state() {
        let exporter = MetricsExporter::new().unwrap();
        let gauge = exporter.packets_gauge();
        gauge.set(7);
        assert_eq!(exporter.packets_total.get(), 7);
    }
}
