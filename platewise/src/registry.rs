use crate::{
    models::{
        Favorite, Like, MenuCategory, MenuComment, MenuItem, Post, PostComment, Restaurant, RestaurantCategory,
        RestaurantComment, User,
    },
    types::{Entity, EntityDescriptor, RelationDescriptor},
};

/// Every stored collection.
pub fn descriptors() -> [&'static EntityDescriptor; 11] {
    [
        User::descriptor(),
        RestaurantCategory::descriptor(),
        MenuCategory::descriptor(),
        Restaurant::descriptor(),
        MenuItem::descriptor(),
        Post::descriptor(),
        Like::descriptor(),
        Favorite::descriptor(),
        PostComment::descriptor(),
        RestaurantComment::descriptor(),
        MenuComment::descriptor(),
    ]
}

pub fn get_descriptor(collection: &str) -> Option<&'static EntityDescriptor> {
    descriptors().into_iter().find(|descriptor| descriptor.collection == collection)
}

/// A belongs-to relation on `source` pointing at some other collection.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRelation {
    pub source: &'static EntityDescriptor,
    pub relation: &'static RelationDescriptor,
}

/// Find all relations from other entities that point to the given collection.
/// When deleting an entity, these are the children its cascade policy applies to.
pub fn find_incoming_relations(target_collection: &str) -> Vec<IncomingRelation> {
    descriptors()
        .into_iter()
        .flat_map(|source| {
            source
                .relations
                .iter()
                .filter(move |relation| relation.target == target_collection)
                .map(move |relation| IncomingRelation { source, relation })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CascadePolicy;

    #[test]
    fn every_relation_target_is_registered() {
        for descriptor in descriptors() {
            for relation in descriptor.relations {
                assert!(
                    get_descriptor(relation.target).is_some(),
                    "{}.{} points at unknown collection {}",
                    descriptor.collection,
                    relation.alias,
                    relation.target
                );
            }
            for has_many in descriptor.has_many {
                assert!(get_descriptor(has_many.target).is_some());
            }
        }
    }

    #[test]
    fn detach_only_on_optional_keys() {
        for descriptor in descriptors() {
            for relation in descriptor.relations {
                if relation.on_target_delete == CascadePolicy::Detach {
                    assert!(relation.optional, "{}.{}", descriptor.collection, relation.alias);
                }
            }
        }
    }

    #[test]
    fn finds_children_of_posts() {
        let mut sources: Vec<&str> = find_incoming_relations("posts")
            .iter()
            .map(|incoming| incoming.source.collection)
            .collect();
        sources.sort_unstable();
        assert_eq!(sources, vec!["post_comments", "post_likes"]);
    }
}
