//! Flow Queries - 表单查询

/// 获取表单视图
#[derive(Debug, Clone)]
pub struct GetFlowQuery {
    pub flow_id: String,
}

/// 获取步骤目录
#[derive(Debug, Clone, Default)]
pub struct GetCatalogQuery;
