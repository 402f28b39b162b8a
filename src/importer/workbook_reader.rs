// ==========================================
// 目录工作簿导入 - 工作簿流式读取器
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls) / ODS / CSV 目录（每个工作表一个 <sheet>.csv）
// 约定: 每个工作表首行为表头；完全空白的行跳过且不计入批次
// ==========================================

use crate::domain::sheet::{CellValue, Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Range, Reader, Sheets};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ==========================================
// BatchSource Trait
// ==========================================
// 用途: 流水线读取阶段的数据来源
// 实现者: WorkbookReader（测试中可替换为内存来源）
pub trait BatchSource: Send {
    /// 读取当前工作表的下一个批次
    ///
    /// # 返回
    /// - Ok(Some(batch)): 非空批次（除最后一批外大小恰为 batch_size）
    /// - Ok(None): 工作表结束
    /// - Err: 读取/解析失败
    fn next_batch(&mut self) -> ImportResult<Option<RowBatch>>;
}

enum Backend {
    Spreadsheet(Sheets<BufReader<File>>),
    CsvDirectory(PathBuf),
    Closed,
}

enum SheetCursor {
    Range { range: Range<Data>, next_row: usize },
    Csv {
        records: csv::StringRecordsIntoIter<File>,
        line: usize,
    },
}

// ==========================================
// WorkbookReader
// ==========================================
pub struct WorkbookReader {
    source: PathBuf,
    backend: Backend,
    batch_size: usize,
    selected: Option<SheetKind>,
    headers: Vec<String>,
    cursor: Option<SheetCursor>,
    next_index: usize,
}

impl WorkbookReader {
    /// 打开工作簿
    ///
    /// # 参数
    /// - path: 工作簿文件或 CSV 目录
    /// - batch_size: 批次大小（整个读取过程中保持不变）
    ///
    /// # 返回
    /// - Err(FormatError): 文件不存在、扩展名不支持或内容不是合法工作簿
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> ImportResult<Self> {
        let path = path.as_ref();

        if batch_size == 0 {
            return Err(ImportError::ConfigValueError {
                key: "import/batch_size".to_string(),
                value: "0".to_string(),
                message: "批次大小必须大于 0".to_string(),
            });
        }

        let backend = if path.is_dir() {
            Backend::CsvDirectory(path.to_path_buf())
        } else {
            if !path.exists() {
                return Err(ImportError::FormatError(format!(
                    "文件不存在: {}",
                    path.display()
                )));
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            match ext.as_str() {
                "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
                    let sheets = open_workbook_auto(path)
                        .map_err(|e| ImportError::FormatError(e.to_string()))?;
                    Backend::Spreadsheet(sheets)
                }
                _ => {
                    return Err(ImportError::FormatError(format!(
                        "不支持的工作簿格式: {}（仅支持 .xlsx/.xlsm/.xlsb/.xls/.ods 或 CSV 目录）",
                        ext
                    )))
                }
            }
        };

        info!(source = %path.display(), batch_size, "工作簿已打开");

        Ok(Self {
            source: path.to_path_buf(),
            backend,
            batch_size,
            selected: None,
            headers: Vec::new(),
            cursor: None,
            next_index: 1,
        })
    }

    /// 当前工作表的表头（已 TRIM）
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.backend, Backend::Closed)
    }

    /// 选中工作表并读取表头；批次序号从 1 重新开始
    ///
    /// # 返回
    /// - Err(SheetNotFound): 工作簿不含该工作表
    pub fn select_sheet(&mut self, kind: SheetKind) -> ImportResult<()> {
        let name = kind.sheet_name();
        self.cursor = None;
        self.headers.clear();
        self.selected = None;
        self.next_index = 1;

        match &mut self.backend {
            Backend::Spreadsheet(sheets) => {
                if !sheets.sheet_names().iter().any(|n| n == name) {
                    return Err(ImportError::SheetNotFound(name.to_string()));
                }
                let range = sheets
                    .worksheet_range(name)
                    .map_err(|e| ImportError::FormatError(e.to_string()))?;

                self.headers = range
                    .rows()
                    .next()
                    .map(|cells| {
                        cells
                            .iter()
                            .map(|cell| cell.to_string().trim().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                self.cursor = Some(SheetCursor::Range { range, next_row: 1 });
            }
            Backend::CsvDirectory(dir) => {
                let path = dir.join(format!("{}.csv", name));
                if !path.is_file() {
                    return Err(ImportError::SheetNotFound(name.to_string()));
                }
                let mut reader = ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true) // 允许行长度不一致
                    .from_path(&path)?;

                self.headers = reader
                    .headers()?
                    .iter()
                    .map(|h| h.trim().to_string())
                    .collect();
                self.cursor = Some(SheetCursor::Csv {
                    records: reader.into_records(),
                    line: 1,
                });
            }
            Backend::Closed => {
                return Err(ImportError::InternalError("工作簿已关闭".to_string()));
            }
        }

        self.selected = Some(kind);
        debug!(sheet = %kind, columns = self.headers.len(), "工作表已选中");
        Ok(())
    }

    /// 释放全部资源（幂等）
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.cursor = None;
        self.selected = None;
        self.backend = Backend::Closed;
        info!(source = %self.source.display(), "工作簿已关闭");
    }
}

impl BatchSource for WorkbookReader {
    fn next_batch(&mut self) -> ImportResult<Option<RowBatch>> {
        let sheet = self
            .selected
            .ok_or_else(|| ImportError::InternalError("未选中工作表".to_string()))?;
        let headers = &self.headers;
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| ImportError::InternalError("未选中工作表".to_string()))?;

        let mut rows = Vec::with_capacity(self.batch_size);
        while rows.len() < self.batch_size {
            let row = match cursor {
                SheetCursor::Range { range, next_row } => {
                    let Some(cells) = range.rows().nth(*next_row) else {
                        break;
                    };
                    *next_row += 1;
                    build_row(headers, *next_row, cells.iter().map(cell_value))
                }
                SheetCursor::Csv { records, line } => {
                    let Some(record) = records.next() else {
                        break;
                    };
                    *line += 1;
                    let record = record.map_err(|e| {
                        ImportError::FormatError(format!("CSV 第 {} 行解析失败: {}", line, e))
                    })?;
                    build_row(headers, *line, record.iter().map(text_value))
                }
            };

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Ok(None);
        }

        let batch = RowBatch::new(sheet, self.next_index, rows);
        self.next_index += 1;
        debug!(sheet = %sheet, batch = batch.index, rows = batch.len(), "批次读取完成");
        Ok(Some(batch))
    }
}

impl Drop for WorkbookReader {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_row(headers: &[String], row_number: usize, cells: impl Iterator<Item = CellValue>) -> Row {
    let mut values = HashMap::with_capacity(headers.len());
    for (header, value) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        values.insert(header.clone(), value);
    }
    Row::new(row_number, values)
}

fn text_value(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(trimmed.to_string())
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => text_value(s),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(CellValue::Date)
            .unwrap_or_else(|| text_value(&cell.to_string())),
        other => text_value(&other.to_string()),
    }
}
