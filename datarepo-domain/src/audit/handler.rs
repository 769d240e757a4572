use super::{Clock, SystemClock};
use crate::entity::Entity;
use std::sync::Arc;

/// 当前操作主体的来源（例如会话中的登录用户）
pub trait AuditorAware: Send + Sync {
    fn current_auditor(&self) -> Option<String>;
}

/// 固定主体
#[derive(Debug, Clone, Default)]
pub struct FixedAuditor(pub Option<String>);

impl AuditorAware for FixedAuditor {
    fn current_auditor(&self) -> Option<String> {
        self.0.clone()
    }
}

/// 审计拦截器：在实体首次持久化与每次更新前调用
#[derive(Clone)]
pub struct AuditingHandler {
    clock: Arc<dyn Clock>,
}

impl Default for AuditingHandler {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AuditingHandler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// 首次持久化前：设置创建时间、修改时间与创建主体
    pub fn before_persist<E: Entity>(&self, entity: &mut E, auditor: &dyn AuditorAware) {
        if let Some(audit) = entity.audit_mut() {
            audit.mark_created(self.clock.now(), auditor.current_auditor());
        }
    }

    /// 更新前：只刷新修改时间与修改主体
    pub fn before_update<E: Entity>(&self, entity: &mut E, auditor: &dyn AuditorAware) {
        if let Some(audit) = entity.audit_mut() {
            audit.mark_modified(self.clock.now(), auditor.current_auditor());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditMetadata, ManualClock};
    use chrono::{Duration, Utc};
    use datarepo_macros::entity;

    #[entity(id = String, key = assigned)]
    #[derive(Clone)]
    struct Item {}

    #[entity]
    #[derive(Clone)]
    struct Plain {
        name: String,
    }

    #[test]
    fn persist_then_update_keeps_created_at() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let handler = AuditingHandler::new(clock.clone());
        let mut item = Item {
            id: "itemA".into(),
            audit: AuditMetadata::default(),
        };
        assert!(item.is_new());

        handler.before_persist(&mut item, &FixedAuditor(Some("admin".into())));
        assert!(!item.is_new());
        let created = item.audit().and_then(|a| a.created_at());

        clock.advance(Duration::milliseconds(10));
        handler.before_update(&mut item, &FixedAuditor(Some("editor".into())));

        let audit = item.audit().unwrap();
        assert_eq!(audit.created_at(), created);
        assert_eq!(audit.created_by(), Some("admin"));
        assert_eq!(audit.last_modified_by(), Some("editor"));
        assert!(audit.updated_at() > created);
    }

    #[test]
    fn entities_without_audit_are_untouched() {
        let handler = AuditingHandler::default();
        let mut plain = Plain {
            id: None,
            name: "x".into(),
        };
        handler.before_persist(&mut plain, &FixedAuditor::default());
        assert!(plain.audit().is_none());
        assert!(plain.is_new());
    }
}
