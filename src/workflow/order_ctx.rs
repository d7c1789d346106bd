//! 订单处理上下文
//!
//! 封装"我正在处理这一批中的第几个订单"这一信息

use std::fmt::Display;

/// 订单处理上下文
#[derive(Debug, Clone)]
pub struct OrderCtx {
    /// 订单号
    pub order_number: String,

    /// 在本批中的序号（从1开始）
    pub index: usize,

    /// 本批订单总数
    pub total: usize,
}

impl OrderCtx {
    pub fn new(order_number: impl Into<String>, index: usize, total: usize) -> Self {
        Self {
            order_number: order_number.into(),
            index,
            total,
        }
    }

    /// 是否是本批最后一个订单
    pub fn is_last(&self) -> bool {
        self.index >= self.total
    }
}

impl Display for OrderCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[订单 {}/{} #{}]", self.index, self.total, self.order_number)
    }
}
