//! Flow Query Handlers

use std::sync::Arc;

use crate::application::commands::FlowView;
use crate::application::error::ApplicationError;
use crate::application::ports::{FlowSession, SessionStorePort};
use crate::application::queries::{GetCatalogQuery, GetFlowQuery};
use crate::domain::flow::StepCatalog;

/// GetFlow Handler - 获取表单视图
pub struct GetFlowHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
}

impl GetFlowHandler {
    pub fn new(flow_store: Arc<dyn SessionStorePort<FlowSession>>) -> Self {
        Self { flow_store }
    }

    pub async fn handle(&self, query: GetFlowQuery) -> Result<FlowView, ApplicationError> {
        let session = self
            .flow_store
            .get(&query.flow_id)
            .map_err(|e| ApplicationError::from_session("Flow", e))?;
        self.flow_store.touch(&query.flow_id);
        Ok(FlowView::from_session(&session))
    }
}

/// GetCatalog Handler - 获取步骤目录
pub struct GetCatalogHandler {
    catalog: Arc<StepCatalog>,
}

impl GetCatalogHandler {
    pub fn new(catalog: Arc<StepCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn handle(&self, _query: GetCatalogQuery) -> Result<Arc<StepCatalog>, ApplicationError> {
        Ok(self.catalog.clone())
    }
}
