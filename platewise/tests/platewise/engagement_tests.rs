use platewise::models::{Favorite, FavoriteInput, Reaction, RestaurantCommentPatch};
use platewise::workflows::{
    FavoriteAction,
    engagement::{react, record_view, toggle_favorite},
};

use super::support::*;

#[tokio::test]
async fn rating_is_the_mean_of_reviews() {
    let client = memory_client();
    let (_, _, restaurant) = seed_catalog(&client).await;
    let ana = seed_user(&client, "ana", Role::Customer).await;
    let ben = seed_user(&client, "ben", Role::Customer).await;
    let restaurants = client.collection::<Restaurant>();

    assert_eq!(restaurants.get_or_error(&restaurant.id).await.unwrap().rating, 0.0);

    let first = review(&client, &ana, &restaurant, 4).await;
    review(&client, &ben, &restaurant, 5).await;
    assert_eq!(restaurants.get_or_error(&restaurant.id).await.unwrap().rating, 4.5);

    client
        .collection::<RestaurantComment>()
        .update(
            &first.id,
            RestaurantCommentPatch {
                content: None,
                rating: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(restaurants.get_or_error(&restaurant.id).await.unwrap().rating, 3.5);

    client.collection::<RestaurantComment>().delete(&first.id).await.unwrap();
    assert_eq!(restaurants.get_or_error(&restaurant.id).await.unwrap().rating, 5.0);
}

#[tokio::test]
async fn rating_outside_range_is_rejected() {
    let client = memory_client();
    let (owner, _, restaurant) = seed_catalog(&client).await;
    let err = client
        .collection::<RestaurantComment>()
        .create(RestaurantCommentInput {
            author_id: owner.id.clone(),
            restaurant_id: restaurant.id.clone(),
            content: "too good".into(),
            rating: 6,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[tokio::test]
async fn rating_resync_recomputes_average() {
    let client = memory_client();
    let (_, _, restaurant) = seed_catalog(&client).await;
    let ana = seed_user(&client, "ana", Role::Customer).await;
    review(&client, &ana, &restaurant, 3).await;

    let rating = CounterSynchronizer::new(client.clone())
        .resync_rating(&restaurant.id)
        .await
        .unwrap();
    assert_eq!(rating, 3.0);
}

#[tokio::test]
async fn favorite_toggle_flips_membership() {
    let client = memory_client();
    let (_, _, restaurant) = seed_catalog(&client).await;
    let diner = seed_user(&client, "diner", Role::Customer).await;

    let added = toggle_favorite(&client, &diner.id, &restaurant.id).await.unwrap();
    assert_eq!(added.action, FavoriteAction::Favorited);
    let favorite = added.favorite.expect("favorite returned");
    assert_eq!(favorite.restaurant_id, restaurant.id);

    let duplicate = client
        .collection::<Favorite>()
        .create(FavoriteInput {
            user_id: diner.id.clone(),
            restaurant_id: restaurant.id.clone(),
            note: Some("again".into()),
        })
        .await;
    assert!(matches!(duplicate, Err(RepoError::UniqueConstraintViolation { .. })));

    let removed = toggle_favorite(&client, &diner.id, &restaurant.id).await.unwrap();
    assert_eq!(removed.action, FavoriteAction::Unfavorited);
    assert!(!client.collection::<Favorite>().exists(&favorite.id).await.unwrap());

    assert!(
        toggle_favorite(&client, &diner.id, "noSuchPlace")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn reactions_bump_counters() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Spicy").await;
    let comment = comment_on(&client, &author, &post, "too hot").await;

    react::<PostComment>(&client, &comment.id, Reaction::Like).await.unwrap();
    react::<PostComment>(&client, &comment.id, Reaction::Like).await.unwrap();
    let reacted = react::<PostComment>(&client, &comment.id, Reaction::Dislike).await.unwrap();
    assert_eq!(reacted.like_count, 2);
    assert_eq!(reacted.dislike_count, 1);

    assert!(
        react::<PostComment>(&client, "goneComment", Reaction::Like)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn views_accumulate() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Popular").await;

    assert_eq!(record_view(&client, &post.id).await.unwrap(), 1);
    assert_eq!(record_view(&client, &post.id).await.unwrap(), 2);
    assert_eq!(client.collection::<Post>().get_or_error(&post.id).await.unwrap().view_count, 2);
}

#[tokio::test]
async fn most_liked_posts_sort_first() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let quiet = seed_post(&client, &author, "Quiet").await;
    let loud = seed_post(&client, &author, "Loud").await;
    let register = LikeRegister::new(client.clone());
    for name in ["ana", "ben"] {
        let user = seed_user(&client, name, Role::Customer).await;
        register.toggle(&loud.id, &user.id).await.unwrap();
    }
    register.toggle(&quiet.id, &author.id).await.unwrap();

    let listed = client
        .collection::<Post>()
        .list(ListQuery::new().sort("like_count", SortOrder::Desc))
        .await
        .unwrap();
    let ids: Vec<&str> = listed.items.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids, vec![loud.id.as_str(), quiet.id.as_str()]);
}
