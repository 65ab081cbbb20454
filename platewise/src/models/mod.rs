//! Stored document types, their descriptors, and the request payloads that
//! create or patch them.

mod category;
mod comment;
mod favorite;
mod like;
mod menu_item;
mod post;
mod restaurant;
mod user;

pub use category::{CategoryInput, CategoryPatch, MenuCategory, MenuCategoryInput, MenuCategoryPatch, RestaurantCategory};
pub use comment::{
    MenuComment, MenuCommentInput, MenuCommentPatch, PostComment, PostCommentInput, PostCommentPatch, Reaction,
    ReactionInput, RestaurantComment, RestaurantCommentInput, RestaurantCommentPatch,
};
pub use favorite::{Favorite, FavoriteInput, FavoritePatch};
pub use like::{Like, LikeInput};
pub use menu_item::{MenuItem, MenuItemInput, MenuItemPatch};
pub use post::{Post, PostInput, PostPatch};
pub use restaurant::{Restaurant, RestaurantInput, RestaurantPatch};
pub use user::{Role, User, UserInput, UserPatch, UserProfile};

use crate::types::{ValidationDescriptor, ValidationRule};

pub(crate) const URL_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Url)];
pub(crate) const IMAGE_LIST_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::each(ValidationRule::Url)];

pub(crate) const fn length(min: usize, max: usize) -> ValidationRule {
    ValidationRule::Length {
        min: Some(min),
        max: Some(max),
    }
}
