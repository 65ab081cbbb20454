pub(crate) use platewise::{
    Client, RepoError,
    models::{
        CategoryInput, Like, LikeInput, MenuCategory, MenuCategoryInput, MenuItem, MenuItemInput, Post, PostComment,
        PostCommentInput, PostInput, Restaurant, RestaurantCategory, RestaurantComment, RestaurantCommentInput,
        RestaurantInput, Role, User, UserInput,
    },
    search::{ListQuery, SortOrder},
    workflows::{CounterSynchronizer, LikeAction, LikeRegister, catalog::create_restaurant},
};
pub(crate) use serde_json::{Value, json};

pub(crate) const PASSWORD: &str = "s3cret-enough";

pub(crate) fn memory_client() -> Client {
    Client::memory("pwtest")
}

pub(crate) async fn seed_user(client: &Client, username: &str, role: Role) -> User {
    client
        .collection::<User>()
        .create(UserInput {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: PASSWORD.to_string(),
            role,
            avatar: None,
            full_name: None,
        })
        .await
        .expect("create user")
}

pub(crate) async fn seed_post(client: &Client, author: &User, title: &str) -> Post {
    client
        .collection::<Post>()
        .create(PostInput {
            author_id: author.id.clone(),
            restaurant_id: None,
            title: title.to_string(),
            content: format!("{title} body"),
            images: Vec::new(),
        })
        .await
        .expect("create post")
}

pub(crate) async fn seed_category(client: &Client, name: &str) -> RestaurantCategory {
    client
        .collection::<RestaurantCategory>()
        .create(CategoryInput {
            name: name.to_string(),
            description: None,
        })
        .await
        .expect("create category")
}

pub(crate) async fn seed_restaurant(client: &Client, owner: &User, category: &RestaurantCategory, name: &str) -> Restaurant {
    create_restaurant(
        client,
        RestaurantInput {
            owner_id: owner.id.clone(),
            category_id: category.id.clone(),
            name: name.to_string(),
            address: "12 Market Street".to_string(),
            phone: "+1 555 0100".to_string(),
            description: String::new(),
            avatar: None,
            images: Vec::new(),
        },
    )
    .await
    .expect("create restaurant")
}

pub(crate) async fn seed_menu_item(client: &Client, restaurant: &Restaurant, name: &str) -> MenuItem {
    let category = client
        .collection::<MenuCategory>()
        .create(MenuCategoryInput {
            name: format!("{name} course"),
            description: None,
        })
        .await
        .expect("create menu category");
    client
        .collection::<MenuItem>()
        .create(MenuItemInput {
            restaurant_id: restaurant.id.clone(),
            category_id: category.id,
            name: name.to_string(),
            description: String::new(),
            price: 9.5,
            main_image: None,
            images: Vec::new(),
        })
        .await
        .expect("create menu item")
}

pub(crate) async fn review(client: &Client, author: &User, restaurant: &Restaurant, rating: u8) -> RestaurantComment {
    client
        .collection::<RestaurantComment>()
        .create(RestaurantCommentInput {
            author_id: author.id.clone(),
            restaurant_id: restaurant.id.clone(),
            content: format!("{rating} stars"),
            rating,
        })
        .await
        .expect("create review")
}

pub(crate) async fn comment_on(client: &Client, author: &User, post: &Post, content: &str) -> PostComment {
    client
        .collection::<PostComment>()
        .create(PostCommentInput {
            author_id: author.id.clone(),
            post_id: post.id.clone(),
            content: content.to_string(),
        })
        .await
        .expect("create comment")
}

/// An owner, a category and one restaurant.
pub(crate) async fn seed_catalog(client: &Client) -> (User, RestaurantCategory, Restaurant) {
    let owner = seed_user(client, "owner", Role::RestaurantOwner).await;
    let category = seed_category(client, "Noodles").await;
    let restaurant = seed_restaurant(client, &owner, &category, "Pho Corner").await;
    (owner, category, restaurant)
}
