// ==========================================
// 批处理流水线集成测试
// ==========================================
// 测试目标: 批次大小、写入顺序、失败后读取阶段在一个批次边界内停止
// ==========================================


use catalogue_import::domain::{Row, RowBatch, SheetKind};
use catalogue_import::importer::{
    run_pipelined, BatchSource, ImportError, ImportResult, SheetImporter, WorkbookReader,
};
use catalogue_import::logging;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use test_helpers::{term_code, write_sheet};

/// 记录写入顺序的导入器
struct RecordingImporter {
    sizes: Arc<Mutex<Vec<(usize, usize)>>>,
    fail_on: Option<usize>,
}

impl SheetImporter for RecordingImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::Term
    }

    fn required_columns(&self) -> Vec<String> {
        vec!["termCode".to_string()]
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        if self.fail_on == Some(batch.index) {
            return Err(ImportError::InternalError(format!("forced failure on {}", batch.index)));
        }
        self.sizes.lock().unwrap().push((batch.index, batch.len()));
        Ok(batch.len())
    }
}

/// 统计读取次数的内存来源
struct CountingSource {
    total_batches: usize,
    batch_size: usize,
    produced: usize,
    reads: Arc<AtomicUsize>,
    fail_on: Option<usize>,
}

impl BatchSource for CountingSource {
    fn next_batch(&mut self) -> ImportResult<Option<RowBatch>> {
        if self.produced == self.total_batches {
            return Ok(None);
        }
        self.produced += 1;
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(self.produced) {
            return Err(ImportError::FormatError("malformed batch".into()));
        }
        let rows = (0..self.batch_size)
            .map(|i| Row::new(i + 2, Default::default()))
            .collect();
        Ok(Some(RowBatch::new(SheetKind::Term, self.produced, rows)))
    }
}

#[tokio::test]
async fn test_250_rows_make_three_ordered_batches() {
    logging::init_test();

    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<Vec<String>> = (1..=250)
        .map(|i| vec![term_code(i), format!("Term {}", i)])
        .collect();
    write_sheet(dir.path(), "term", &["termCode", "termExtendedName"], &rows);

    let mut reader = WorkbookReader::open(dir.path(), 100).unwrap();
    reader.select_sheet(SheetKind::Term).unwrap();

    let sizes = Arc::new(Mutex::new(Vec::new()));
    let importer = RecordingImporter {
        sizes: sizes.clone(),
        fail_on: None,
    };
    importer.validate_header(reader.headers()).unwrap();

    let run = run_pipelined(reader, importer).await.unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![(1, 100), (2, 100), (3, 50)]);
    assert_eq!(run.report.batches, 3);
    assert_eq!(run.report.rows, 250);
    assert_eq!(run.report.committed, 250);
}

#[tokio::test]
async fn test_writer_failure_stops_reader_within_one_batch() {
    logging::init_test();

    let reads = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        total_batches: 8,
        batch_size: 10,
        produced: 0,
        reads: reads.clone(),
        fail_on: None,
    };
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let importer = RecordingImporter {
        sizes: sizes.clone(),
        fail_on: Some(2),
    };

    let err = run_pipelined(source, importer).await.err().unwrap();

    assert_eq!(err.sheet(), Some(SheetKind::Term));
    assert_eq!(err.batch(), Some(2));
    // 批次 k 失败时，最多读到 k+1，绝不读到 k+2
    assert!(reads.load(Ordering::SeqCst) <= 3);
    assert_eq!(*sizes.lock().unwrap(), vec![(1, 10)]);
}

#[tokio::test]
async fn test_reader_failure_is_tagged_and_earlier_batches_commit() {
    logging::init_test();

    let reads = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        total_batches: 5,
        batch_size: 4,
        produced: 0,
        reads: reads.clone(),
        fail_on: Some(3),
    };
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let importer = RecordingImporter {
        sizes: sizes.clone(),
        fail_on: None,
    };

    let err = run_pipelined(source, importer).await.err().unwrap();

    assert_eq!(err.batch(), Some(3));
    assert!(matches!(err.root(), ImportError::FormatError(_)));
    assert_eq!(reads.load(Ordering::SeqCst), 3);
    assert_eq!(*sizes.lock().unwrap(), vec![(1, 4), (2, 4)]);
}
