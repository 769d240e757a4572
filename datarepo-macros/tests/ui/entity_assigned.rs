use datarepo_domain::audit::AuditMetadata;
use datarepo_domain::entity::{Entity, KeyStrategy};
use datarepo_macros::{entity, entity_id};

#[entity_id]
struct ItemId(String);

#[entity(id = ItemId, key = assigned, debug = false)]
#[derive(Clone)]
struct Item {
    price: u64,
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Item({})", self.id)
    }
}

fn main() {
    let item = Item {
        id: ItemId::new("itemA".into()),
        audit: AuditMetadata::default(),
        price: 1000,
    };
    assert_eq!(Item::KEY_STRATEGY, KeyStrategy::Assigned);
    assert_eq!(item.id().map(ToString::to_string).as_deref(), Some("itemA"));
    assert!(item.is_new());
    assert_eq!(format!("{item:?}"), "Item(itemA)");
}
