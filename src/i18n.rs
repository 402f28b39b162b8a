// ==========================================
// 目录工作簿导入 - 国际化
// ==========================================
// 范围: 进度标签（progress.*）与导入结果消息（import.*）
// 语言: zh-CN（默认）/ en，词条位于 locales/*.yml
// rust_i18n::i18n! 宏在 lib.rs 中初始化
// ==========================================

use crate::domain::types::SheetKind;

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换语言（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译无参数词条
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译词条并替换 `%{name}` 占位符
///
/// # 示例
/// ```no_run
/// use catalogue_import::i18n::t_with_args;
/// let msg = t_with_args("import.sheet_not_found", &[("sheet", "releaseNotes")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(rust_i18n::t!(key).to_string(), |msg, (name, value)| {
            msg.replace(&format!("%{{{}}}", name), value)
        })
}

/// 工作表阶段开始时上报的进度标签
pub fn progress_label(sheet: SheetKind) -> String {
    let key = match sheet {
        SheetKind::Catalogue => "progress.import_catalogue",
        SheetKind::Hierarchy => "progress.import_hierarchy",
        SheetKind::Attribute => "progress.import_attribute",
        SheetKind::Term => "progress.import_term",
        SheetKind::TermRelations => "progress.import_term_relations",
        SheetKind::Notes => "progress.import_release_notes",
    };
    t(key)
}
