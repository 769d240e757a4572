//! 分页与排序
//!
//! - [`PageRequest`]：从 0 开始的页码、页大小（> 0）与排序键；
//! - [`Page`]：包含总数的分页结果；
//! - [`Slice`]：不做计数，只知道是否存在下一页。
//!
use crate::error::{DomainError, DomainResult};
use crate::record::Record;
use crate::value::Value;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;

/// 排序方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_descending(&self) -> bool {
        matches!(self, Direction::Desc)
    }
}

/// 单个排序键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    property: String,
    direction: Direction,
    #[serde(default)]
    ignore_case: bool,
}

impl Order {
    pub fn new(direction: Direction, property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction,
            ignore_case: false,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(Direction::Asc, property)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(Direction::Desc, property)
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// 按该键比较两条记录；空值在升序时排最前
    pub fn compare<R: Record + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        let mut left = a.field(&self.property).unwrap_or(Value::Null);
        let mut right = b.field(&self.property).unwrap_or(Value::Null);
        if self.ignore_case {
            left = left.lowercase();
            right = right.lowercase();
        }

        let ord = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => left.compare(&right).unwrap_or(Ordering::Equal),
        };

        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// 有序的排序键序列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// `Sort::by(Direction::Desc, ["username"])`
    pub fn by<I, P>(direction: Direction, properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            orders: properties
                .into_iter()
                .map(|p| Order::new(direction, p))
                .collect(),
        }
    }

    pub fn from_orders(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// 追加排序键（保持先后顺序）
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn push(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, property: &str) -> bool {
        self.orders.iter().any(|o| o.property == property)
    }

    /// 追加稳定的次级排序键（通常为实体标识），使分页结果在多次调用间确定
    pub fn with_tie_break(mut self, property: &str) -> Self {
        if !self.contains(property) {
            self.orders.push(Order::asc(property));
        }
        self
    }

    pub fn compare<R: Record + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        for order in &self.orders {
            let ord = order.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// 分页请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u64,
    size: u64,
    #[serde(default)]
    sort: Sort,
}

impl PageRequest {
    /// 页码从 0 开始；页大小为 0 属于配置错误
    pub fn of(page: u64, size: u64) -> DomainResult<Self> {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    pub fn of_sorted(page: u64, size: u64, sort: Sort) -> DomainResult<Self> {
        if size == 0 {
            return Err(DomainError::configuration("page size must be greater than zero"));
        }
        Ok(Self { page, size, sort })
    }

    pub fn of_size(size: u64) -> DomainResult<Self> {
        Self::of(0, size)
    }

    pub fn page_number(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn with_sort(&self, sort: Sort) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    pub fn with_size(&self, size: u64) -> DomainResult<Self> {
        Self::of_sorted(self.page, size, self.sort.clone())
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }

    pub fn first(&self) -> Self {
        Self {
            page: 0,
            ..self.clone()
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}

/// 包含总数的分页结果
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    request: PageRequest,
    total: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            content,
            request,
            total,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.request.page
    }

    pub fn size(&self) -> u64 {
        self.request.size
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> u64 {
        self.total
    }

    /// `ceil(total / size)`
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.request.size)
    }

    pub fn has_next(&self) -> bool {
        self.number() + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number() > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    pub fn next_request(&self) -> Option<PageRequest> {
        self.has_next().then(|| self.request.next())
    }

    /// 转换内容类型（例如实体到 DTO），分页信息保持不变
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            request: self.request,
            total: self.total,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Page", 8)?;
        s.serialize_field("content", &self.content)?;
        s.serialize_field("totalElements", &self.total)?;
        s.serialize_field("totalPages", &self.total_pages())?;
        s.serialize_field("number", &self.number())?;
        s.serialize_field("size", &self.size())?;
        s.serialize_field("first", &self.is_first())?;
        s.serialize_field("last", &self.is_last())?;
        s.serialize_field("hasNext", &self.has_next())?;
        s.end()
    }
}

/// 不做计数的分页结果
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    content: Vec<T>,
    request: PageRequest,
    has_next: bool,
}

impl<T> Slice<T> {
    pub fn new(content: Vec<T>, request: PageRequest, has_next: bool) -> Self {
        Self {
            content,
            request,
            has_next,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.request.page
    }

    pub fn size(&self) -> u64 {
        self.request.size
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_previous(&self) -> bool {
        self.number() > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }

    pub fn next_request(&self) -> Option<PageRequest> {
        self.has_next.then(|| self.request.next())
    }

    pub fn map<U, F>(self, f: F) -> Slice<U>
    where
        F: FnMut(T) -> U,
    {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            request: self.request,
            has_next: self.has_next,
        }
    }
}

impl<T: Serialize> Serialize for Slice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Slice", 8)?;
        s.serialize_field("content", &self.content)?;
        s.serialize_field("totalElements", &Option::<u64>::None)?;
        s.serialize_field("totalPages", &Option::<u64>::None)?;
        s.serialize_field("number", &self.number())?;
        s.serialize_field("size", &self.size())?;
        s.serialize_field("first", &self.is_first())?;
        s.serialize_field("last", &self.is_last())?;
        s.serialize_field("hasNext", &self.has_next)?;
        s.end()
    }
}
