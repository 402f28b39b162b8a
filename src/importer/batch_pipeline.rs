// ==========================================
// 目录工作簿导入 - 批处理流水线
// ==========================================
// 读取阶段: 异步循环，每次读取在 blocking 线程池执行
// 写入阶段: blocking 任务，按批次序号顺序调用 import_data
// 交接: 容量为 1 的 mpsc 通道；先预留槽位再读取下一批（深度 1）
// 失败: 任一阶段失败即丢弃己方通道端，对方在下一个交接点停止
// ==========================================

use crate::domain::sheet::RowBatch;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_importer::SheetImporter;
use crate::importer::workbook_reader::BatchSource;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 单张工作表的处理汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub batches: usize,
    pub rows: usize,
    pub committed: usize,
}

/// 流水线结束后交还的读取器与导入器
pub struct PipelineRun<S, I> {
    pub source: S,
    pub importer: I,
    pub report: PipelineReport,
}

/// 以读写重叠方式处理当前工作表的全部批次
///
/// # 参数
/// - source: 已选中工作表的批次来源
/// - importer: 目标工作表导入器（表头应已校验）
///
/// # 返回
/// - Ok(PipelineRun): 最后一批写入完成后返回
/// - Err: 首个失败（带工作表与批次序号）；写入失败优先于其后的读取失败
pub async fn run_pipelined<S, I>(source: S, importer: I) -> ImportResult<PipelineRun<S, I>>
where
    S: BatchSource + 'static,
    I: SheetImporter + 'static,
{
    let sheet = importer.sheet_kind();
    let (tx, mut rx) = mpsc::channel::<RowBatch>(1);

    // ===== 写入阶段 =====
    let writer = tokio::task::spawn_blocking(move || {
        let mut importer = importer;
        let mut report = PipelineReport::default();
        while let Some(batch) = rx.blocking_recv() {
            match importer.import_data(&batch) {
                Ok(committed) => {
                    report.batches += 1;
                    report.rows += batch.len();
                    report.committed += committed;
                }
                Err(e) => {
                    warn!(sheet = %sheet, batch = batch.index, error = %e, "写入阶段失败");
                    return (importer, report, Err(e.at(sheet, Some(batch.index))));
                }
            }
        }
        (importer, report, Ok(()))
    });

    // ===== 读取阶段 =====
    let mut source = source;
    let mut read_error: Option<ImportError> = None;
    let mut batches_read = 0usize;
    loop {
        // 槽位被占用时在此挂起；写入阶段退出后预留失败
        let permit = match tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => {
                debug!(sheet = %sheet, batches_read, "写入阶段已停止，读取阶段退出");
                break;
            }
        };

        let (returned, result) = tokio::task::spawn_blocking(move || {
            let mut source = source;
            let result = source.next_batch();
            (source, result)
        })
        .await?;
        source = returned;

        match result {
            Ok(Some(batch)) => {
                batches_read += 1;
                debug!(sheet = %sheet, batch = batch.index, rows = batch.len(), "批次已交接");
                permit.send(batch);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(sheet = %sheet, batch = batches_read + 1, error = %e, "读取阶段失败");
                read_error = Some(e.at(sheet, Some(batches_read + 1)));
                break;
            }
        }
    }
    // 结束信号
    drop(tx);

    let (importer, report, write_result) = writer.await?;
    write_result?;
    if let Some(e) = read_error {
        return Err(e);
    }

    info!(
        sheet = %sheet,
        batches = report.batches,
        rows = report.rows,
        committed = report.committed,
        "流水线完成"
    );
    Ok(PipelineRun {
        source,
        importer,
        report,
    })
}

/// 不重叠的顺序处理（小表）
pub fn run_sequential<S, I>(source: &mut S, importer: &mut I) -> ImportResult<PipelineReport>
where
    S: BatchSource + ?Sized,
    I: SheetImporter + ?Sized,
{
    let sheet = importer.sheet_kind();
    let mut report = PipelineReport::default();
    let mut index = 0usize;
    loop {
        let batch = match source.next_batch() {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => return Err(e.at(sheet, Some(index + 1))),
        };
        index = batch.index;

        let committed = importer
            .import_data(&batch)
            .map_err(|e| e.at(sheet, Some(batch.index)))?;
        report.batches += 1;
        report.rows += batch.len();
        report.committed += committed;
    }

    debug!(
        sheet = %sheet,
        batches = report.batches,
        committed = report.committed,
        "顺序处理完成"
    );
    Ok(report)
}
