// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 在 `listen_addr` 上启动 Prometheus 导出器并注册流水线指标。
/// 地址无效或端口被占用时只记录警告，不影响流水线运行。
pub fn init_metrics(listen_addr: &str) {
    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", listen_addr, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return;
    }

    describe_counter!(
        "pipeline_stage_runs_total",
        "Stage invocations labelled by stage and outcome"
    );
    describe_counter!(
        "pipeline_pages_rejected_total",
        "Pages rejected before posting, labelled by reason"
    );
    describe_counter!(
        "pipeline_refine_failures_total",
        "Refinement runs that persisted the original record as Failed"
    );

    info!("Metrics exporter listening on {}", addr);
}

/// 记录一次阶段运行
pub fn record_stage_run(stage: &'static str, outcome: &'static str) {
    counter!("pipeline_stage_runs_total", "stage" => stage, "outcome" => outcome).increment(1);
}

/// 记录一次页面拒绝
pub fn record_page_rejected(reason: &'static str) {
    counter!("pipeline_pages_rejected_total", "reason" => reason).increment(1);
}

pub fn record_refine_failure(stage: &'static str) {
    counter!("pipeline_refine_failures_total", "stage" => stage).increment(1);
}
