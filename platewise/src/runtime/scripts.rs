use redis::Script;
use std::sync::LazyLock;

const PRELUDE: &str = include_str!("../../lua/prelude.lua");

pub const ENTITY_INSERT_SCRIPT_BODY: &str = include_str!("../../lua/entity_insert.lua");
pub const ENTITY_PATCH_SCRIPT_BODY: &str = include_str!("../../lua/entity_patch.lua");
pub const ENTITY_DELETE_SCRIPT_BODY: &str = include_str!("../../lua/entity_delete.lua");
pub const RELATION_TOGGLE_SCRIPT_BODY: &str = include_str!("../../lua/relation_toggle.lua");
pub const AGGREGATE_REFRESH_SCRIPT_BODY: &str = include_str!("../../lua/aggregate_refresh.lua");
pub const COUNTER_INCREMENT_SCRIPT_BODY: &str = include_str!("../../lua/counter_increment.lua");

fn with_prelude(body: &str) -> Script {
    Script::new(&[PRELUDE, body].concat())
}

pub static ENTITY_INSERT_SCRIPT: LazyLock<Script> = LazyLock::new(|| with_prelude(ENTITY_INSERT_SCRIPT_BODY));
pub static ENTITY_PATCH_SCRIPT: LazyLock<Script> = LazyLock::new(|| with_prelude(ENTITY_PATCH_SCRIPT_BODY));
pub static ENTITY_DELETE_SCRIPT: LazyLock<Script> = LazyLock::new(|| with_prelude(ENTITY_DELETE_SCRIPT_BODY));
pub static RELATION_TOGGLE_SCRIPT: LazyLock<Script> = LazyLock::new(|| with_prelude(RELATION_TOGGLE_SCRIPT_BODY));
pub static AGGREGATE_REFRESH_SCRIPT: LazyLock<Script> = LazyLock::new(|| with_prelude(AGGREGATE_REFRESH_SCRIPT_BODY));
pub static COUNTER_INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| with_prelude(COUNTER_INCREMENT_SCRIPT_BODY));
