//! 分页执行
//!
//! 页内容与总数分两次往返读取；以下情况可由内容推断总数而跳过计数：
//! - 首页且内容不足一页；
//! - 非空且内容不足一页（必为最后一页）。
//!
use super::data_source::{DataSource, Window};
use crate::entity::Entity;
use crate::error::DomainResult;
use crate::paging::{Page, PageRequest, Slice, Sort};
use crate::specification::Specification;

/// 有效排序：调用方排序 → 声明排序 → 标识兜底，保证分页稳定
pub fn ordering(dynamic: Option<&Sort>, declared: &Sort) -> Sort {
    dynamic
        .cloned()
        .unwrap_or_default()
        .and(declared.clone())
        .with_tie_break("id")
}

fn window_of(request: &PageRequest) -> Window {
    Window::new(request.offset(), Some(request.page_size()))
}

pub async fn page<E: Entity>(
    source: &dyn DataSource<E>,
    filter: &dyn Specification<E>,
    count_filter: &dyn Specification<E>,
    sort: &Sort,
    request: &PageRequest,
) -> DomainResult<Page<E>> {
    let content = source.select(filter, sort, window_of(request)).await?;
    let len = content.len() as u64;
    let size = request.page_size();

    let inferred = if request.offset() == 0 && len < size {
        Some(len)
    } else if len > 0 && len < size {
        Some(request.offset() + len)
    } else {
        None
    };
    let total = match inferred {
        Some(total) => total,
        None => source.count(count_filter).await?,
    };

    tracing::trace!(
        entity = E::TYPE,
        page = request.page_number(),
        size,
        total,
        count_skipped = inferred.is_some(),
        "page loaded"
    );
    Ok(Page::new(content, request.clone(), total))
}

/// 切片：多取一行判断是否存在下一页，不计数
pub async fn slice<E: Entity>(
    source: &dyn DataSource<E>,
    filter: &dyn Specification<E>,
    sort: &Sort,
    request: &PageRequest,
) -> DomainResult<Slice<E>> {
    let size = request.page_size();
    let mut content = source
        .select(filter, sort, Window::new(request.offset(), Some(size + 1)))
        .await?;
    let has_next = content.len() as u64 > size;
    content.truncate(size as usize);
    Ok(Slice::new(content, request.clone(), has_next))
}
