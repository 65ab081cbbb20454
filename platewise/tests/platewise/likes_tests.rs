use super::support::*;

#[tokio::test]
async fn toggle_likes_then_unlikes() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let reader = seed_user(&client, "reader", Role::Customer).await;
    let post = seed_post(&client, &author, "Best ramen in town").await;
    let register = LikeRegister::new(client.clone());

    let liked = register.toggle(&post.id, &reader.id).await.expect("like");
    assert_eq!(liked.action, LikeAction::Liked);
    assert_eq!(liked.like_count, 1);
    let like = liked.like.expect("created like is returned");
    assert_eq!(like.post_id, post.id);
    assert_eq!(like.user_id, reader.id);
    assert!(register.is_liked(&post.id, &reader.id).await.unwrap());

    let stored = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(stored.like_count, 1);

    let unliked = register.toggle(&post.id, &reader.id).await.expect("unlike");
    assert_eq!(unliked.action, LikeAction::Unliked);
    assert_eq!(unliked.like_count, 0);
    assert!(unliked.like.is_none());
    assert!(!register.is_liked(&post.id, &reader.id).await.unwrap());
    assert!(!client.collection::<Like>().exists(&like.id).await.unwrap());

    let stored = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(stored.like_count, 0);
}

#[tokio::test]
async fn even_number_of_toggles_restores_state() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let reader = seed_user(&client, "reader", Role::Customer).await;
    let post = seed_post(&client, &author, "Dumplings").await;
    let register = LikeRegister::new(client.clone());

    for _ in 0..4 {
        register.toggle(&post.id, &reader.id).await.expect("toggle");
    }

    assert!(!register.is_liked(&post.id, &reader.id).await.unwrap());
    assert_eq!(register.count_for_post(&post.id).await.unwrap(), 0);
}

#[tokio::test]
async fn count_tracks_distinct_users() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Tacos").await;
    let register = LikeRegister::new(client.clone());

    for name in ["ana", "ben", "cho"] {
        let user = seed_user(&client, name, Role::Customer).await;
        register.toggle(&post.id, &user.id).await.expect("like");
    }
    let author_like = register.toggle(&post.id, &author.id).await.expect("self like");
    assert_eq!(author_like.like_count, 4);
    assert_eq!(register.count_for_post(&post.id).await.unwrap(), 4);

    let stored = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(stored.like_count, 4);
}

#[tokio::test]
async fn direct_duplicate_like_is_rejected() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Curry").await;
    let likes = client.collection::<Like>();
    let input = || LikeInput {
        post_id: post.id.clone(),
        user_id: author.id.clone(),
    };

    let first = likes.create(input()).await.expect("first like");
    let err = likes.create(input()).await.unwrap_err();
    match err {
        RepoError::UniqueConstraintViolation { existing_entity_id, .. } => assert_eq!(existing_entity_id, first.id),
        other => panic!("expected unique violation, got {other:?}"),
    }
    assert_eq!(likes.count_related("post", &post.id).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_never_duplicate() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let reader = seed_user(&client, "reader", Role::Customer).await;
    let post = seed_post(&client, &author, "Bibimbap").await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let register = LikeRegister::new(client.clone());
        let (post_id, user_id) = (post.id.clone(), reader.id.clone());
        tasks.push(tokio::spawn(async move { register.toggle(&post_id, &user_id).await }));
    }
    let mut liked = 0;
    for task in tasks {
        if task.await.unwrap().expect("toggle").action == LikeAction::Liked {
            liked += 1;
        }
    }

    // every add is matched by a remove
    assert_eq!(liked, 5);
    let register = LikeRegister::new(client.clone());
    assert_eq!(register.count_for_post(&post.id).await.unwrap(), 0);
    assert!(!register.is_liked(&post.id, &reader.id).await.unwrap());
    let stored = client.collection::<Post>().get_or_error(&post.id).await.unwrap();
    assert_eq!(stored.like_count, 0);
}

#[tokio::test]
async fn toggle_requires_existing_post_and_user() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Pizza").await;
    let register = LikeRegister::new(client.clone());

    assert!(register.toggle("missingPost", &author.id).await.unwrap_err().is_not_found());
    assert!(register.toggle(&post.id, "missingUser").await.unwrap_err().is_not_found());
    assert!(matches!(
        register.toggle("bad id", &author.id).await,
        Err(RepoError::Validation(_))
    ));
    assert!(register.count_for_post("missingPost").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn resync_repairs_drifted_counter() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Falafel").await;
    let register = LikeRegister::new(client.clone());
    register.toggle(&post.id, &author.id).await.expect("like");

    client
        .collection::<Post>()
        .increment(&post.id, "like_count", 5)
        .await
        .expect("drift counter");
    assert_eq!(client.collection::<Post>().get_or_error(&post.id).await.unwrap().like_count, 6);

    let count = CounterSynchronizer::new(client.clone()).resync(&post.id).await.expect("resync");
    assert_eq!(count, 1);
    assert_eq!(client.collection::<Post>().get_or_error(&post.id).await.unwrap().like_count, 1);
}

#[tokio::test]
async fn like_lists_show_the_other_side() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let reader = seed_user(&client, "reader", Role::Customer).await;
    let first = seed_post(&client, &author, "First").await;
    let second = seed_post(&client, &author, "Second").await;
    let register = LikeRegister::new(client.clone());
    register.toggle(&first.id, &reader.id).await.unwrap();
    register.toggle(&second.id, &reader.id).await.unwrap();

    let mine = register.list_for_user(&reader.id).await.expect("user likes");
    assert_eq!(mine.len(), 2);
    let titles: Vec<&str> = mine.iter().filter_map(|like| like["post"]["title"].as_str()).collect();
    assert!(titles.contains(&"First") && titles.contains(&"Second"));
    assert!(mine.iter().all(|like| like.get("user").is_none()));

    let likers = register.list_for_post(&first.id).await.expect("post likes");
    assert_eq!(likers.len(), 1);
    assert_eq!(likers[0]["user"]["username"], "reader");
    assert!(likers[0].get("post").is_none());
}
