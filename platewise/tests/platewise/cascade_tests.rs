use super::support::*;

#[tokio::test]
async fn deleting_post_removes_likes_and_comments() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let reader = seed_user(&client, "reader", Role::Customer).await;
    let post = seed_post(&client, &author, "Goodbye soon").await;
    let like = LikeRegister::new(client.clone())
        .toggle(&post.id, &reader.id)
        .await
        .unwrap()
        .like
        .expect("like created");
    let comment = comment_on(&client, &reader, &post, "Nice").await;

    let deleted = client.collection::<Post>().delete(&post.id).await.expect("delete post");
    assert_eq!(deleted.id, post.id);

    assert!(!client.collection::<Post>().exists(&post.id).await.unwrap());
    assert!(!client.collection::<Like>().exists(&like.id).await.unwrap());
    assert!(!client.collection::<PostComment>().exists(&comment.id).await.unwrap());
    assert!(client.collection::<User>().exists(&reader.id).await.unwrap());
    assert!(!LikeRegister::new(client.clone()).is_liked(&post.id, &reader.id).await.unwrap());
}

#[tokio::test]
async fn deleting_user_with_restaurant_is_restricted() {
    let client = memory_client();
    let (owner, _, restaurant) = seed_catalog(&client).await;

    let err = client.collection::<User>().delete(&owner.id).await.unwrap_err();
    match err {
        RepoError::Restricted { collection, dependents, .. } => {
            assert_eq!(collection, "users");
            assert_eq!(dependents, "restaurants");
        }
        other => panic!("expected restricted, got {other:?}"),
    }
    assert!(client.collection::<User>().exists(&owner.id).await.unwrap());
    assert!(client.collection::<Restaurant>().exists(&restaurant.id).await.unwrap());
}

#[tokio::test]
async fn deleting_category_in_use_is_restricted() {
    let client = memory_client();
    let (_, category, _) = seed_catalog(&client).await;

    assert!(matches!(
        client.collection::<RestaurantCategory>().delete(&category.id).await,
        Err(RepoError::Restricted { .. })
    ));
}

#[tokio::test]
async fn deleting_user_removes_their_content() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let reader = seed_user(&client, "reader", Role::Customer).await;
    let own_post = seed_post(&client, &author, "Mine").await;
    let other_post = seed_post(&client, &reader, "Theirs").await;
    let register = LikeRegister::new(client.clone());
    register.toggle(&other_post.id, &author.id).await.unwrap();
    let comment = comment_on(&client, &author, &other_post, "Agreed").await;

    client.collection::<User>().delete(&author.id).await.expect("delete user");

    assert!(!client.collection::<Post>().exists(&own_post.id).await.unwrap());
    assert!(!client.collection::<PostComment>().exists(&comment.id).await.unwrap());
    let other = client.collection::<Post>().get_or_error(&other_post.id).await.unwrap();
    assert_eq!(other.like_count, 0);
    assert!(other.comments.is_empty());
}

#[tokio::test]
async fn deleting_restaurant_detaches_posts_and_drops_menu() {
    let client = memory_client();
    let (_, _, restaurant) = seed_catalog(&client).await;
    let critic = seed_user(&client, "critic", Role::Customer).await;
    let dish = seed_menu_item(&client, &restaurant, "Pho Bo").await;
    let review = review(&client, &critic, &restaurant, 4).await;
    let post = client
        .collection::<Post>()
        .create(PostInput {
            author_id: critic.id.clone(),
            restaurant_id: Some(restaurant.id.clone()),
            title: "Visited".into(),
            content: "Broth was great".into(),
            images: Vec::new(),
        })
        .await
        .unwrap();

    client.collection::<Restaurant>().delete(&restaurant.id).await.expect("delete restaurant");

    assert!(!client.collection::<MenuItem>().exists(&dish.id).await.unwrap());
    assert!(!client.collection::<RestaurantComment>().exists(&review.id).await.unwrap());
    let post = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(post.restaurant_id, None);
}

#[tokio::test]
async fn child_arrays_follow_inserts_and_deletes() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Threads").await;
    let first = comment_on(&client, &author, &post, "one").await;
    let second = comment_on(&client, &author, &post, "two").await;

    let stored = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(stored.comments, vec![first.id.clone(), second.id.clone()]);

    client.collection::<PostComment>().delete(&first.id).await.unwrap();
    let stored = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(stored.comments, vec![second.id.clone()]);
}

#[tokio::test]
async fn populated_post_resolves_author_and_comments() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Joined").await;
    comment_on(&client, &author, &post, "first!").await;

    let shown = client.collection::<Post>().get_populated(&post.id).await.unwrap();
    assert_eq!(shown["author"]["username"], "author");
    assert_eq!(shown["author"]["id"], json!(author.id));
    assert!(shown["author"].get("password_hash").is_none());
    assert_eq!(shown["restaurant"], Value::Null);
    assert_eq!(shown["comments"][0]["content"], "first!");
}
