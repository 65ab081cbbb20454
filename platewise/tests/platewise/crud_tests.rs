use std::collections::HashSet;

use platewise::models::{RestaurantPatch, UserPatch};
use platewise::workflows::{
    LoginRequest,
    catalog::{update_restaurant, update_user},
    login,
};

use super::support::*;

#[tokio::test]
async fn user_password_is_hashed_and_hidden() {
    let client = memory_client();
    let users = client.collection::<User>();
    let user = seed_user(&client, "alice", Role::Customer).await;

    assert_ne!(user.password_hash, PASSWORD);
    assert!(user.password_hash.starts_with("$argon2"));

    let shown = users.present(&user).unwrap();
    assert!(shown.get("password_hash").is_none());
    assert_eq!(shown["username"], "alice");

    let populated = users.get_populated(&user.id).await.unwrap();
    assert!(populated.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_username_conflicts_case_insensitively() {
    let client = memory_client();
    let first = seed_user(&client, "alice", Role::Customer).await;

    let err = client
        .collection::<User>()
        .create(UserInput {
            username: "ALICE".into(),
            email: "other@example.com".into(),
            password: PASSWORD.into(),
            role: Role::Customer,
            avatar: None,
            full_name: None,
        })
        .await
        .unwrap_err();
    match err {
        RepoError::UniqueConstraintViolation {
            fields,
            existing_entity_id,
            ..
        } => {
            assert_eq!(fields, vec!["username".to_string()]);
            assert_eq!(existing_entity_id, first.id);
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_fields_are_reported() {
    let client = memory_client();
    let err = client
        .collection::<User>()
        .create(UserInput {
            username: "x".into(),
            email: "not-an-email".into(),
            password: PASSWORD.into(),
            role: Role::Customer,
            avatar: None,
            full_name: None,
        })
        .await
        .unwrap_err();
    let RepoError::Validation(validation) = err else {
        panic!("expected validation error");
    };
    let fields: HashSet<&str> = validation.issues.iter().map(|issue| issue.field.as_str()).collect();
    assert!(fields.contains("username"));
    assert!(fields.contains("email"));
}

#[tokio::test]
async fn pages_are_disjoint_and_counted() {
    let client = memory_client();
    for name in ["Thai", "Korean", "Mexican", "Italian", "Greek"] {
        seed_category(&client, name).await;
    }
    let categories = client.collection::<RestaurantCategory>();

    let mut seen = HashSet::new();
    for page in 1..=3 {
        let listed = categories
            .list(ListQuery::new().page(page, 2).sort("name", SortOrder::Asc))
            .await
            .expect("list");
        assert_eq!(listed.total_record, 5);
        assert_eq!(listed.page, page);
        assert_eq!(listed.items.len(), if page == 3 { 1 } else { 2 });
        for item in listed.items {
            assert!(seen.insert(item.id), "item repeated across pages");
        }
    }
    assert_eq!(seen.len(), 5);

    let first = categories
        .list(ListQuery::new().page(1, 1).sort("name", SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(first.items[0].name, "Greek");
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let client = memory_client();
    for name in ["Thai", "Korean", "Greek"] {
        seed_category(&client, name).await;
    }
    let categories = client.collection::<RestaurantCategory>();

    let far = categories.list(ListQuery::new().page(u64::MAX, 10)).await.expect("list");
    assert!(far.items.is_empty());
    assert_eq!(far.total_record, 3);
    assert_eq!(far.page, u64::MAX);

    let next = categories.list(ListQuery::new().page(2, 3)).await.expect("list");
    assert!(next.items.is_empty());
    assert_eq!(next.total_record, 3);
}

#[tokio::test]
async fn multi_word_title_filter_needs_every_word() {
    let client = memory_client();
    let author = seed_user(&client, "critic", Role::Customer).await;
    let both = seed_post(&client, &author, "Best pizza downtown").await;
    let reordered = seed_post(&client, &author, "Pizza that is the best").await;
    seed_post(&client, &author, "Best ramen").await;

    let listed = client
        .collection::<Post>()
        .list(ListQuery::new().filter("title", "best  PIZZA").sort("title", SortOrder::Asc))
        .await
        .expect("list");
    let ids: HashSet<String> = listed.items.into_iter().map(|post| post.id).collect();
    assert_eq!(ids, HashSet::from([both.id, reordered.id]));
}

#[tokio::test]
async fn list_rejects_unknown_sort_and_filter() {
    let client = memory_client();
    let posts = client.collection::<Post>();
    assert!(matches!(
        posts.list(ListQuery::new().sort("password", SortOrder::Asc)).await,
        Err(RepoError::InvalidRequest { .. })
    ));
    assert!(matches!(
        posts.list(ListQuery::new().filter("secret", "x")).await,
        Err(RepoError::InvalidRequest { .. })
    ));
}

#[tokio::test]
async fn inactive_records_are_hidden_unless_requested() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let shown = seed_post(&client, &author, "Visible").await;
    let hidden = seed_post(&client, &author, "Hidden").await;
    let posts = client.collection::<Post>();
    posts
        .update(
            &hidden.id,
            platewise::models::PostPatch {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let listed = posts.list(ListQuery::new()).await.unwrap();
    assert_eq!(listed.total_record, 1);
    assert_eq!(listed.items[0].id, shown.id);

    let everything = posts.list(ListQuery::new().including_inactive()).await.unwrap();
    assert_eq!(everything.total_record, 2);

    let by_title = posts
        .list(ListQuery::new().filter("title", "visi").filter("author_id", author.id.clone()))
        .await
        .unwrap();
    assert_eq!(by_title.total_record, 1);
}

#[tokio::test]
async fn partial_update_preserves_other_fields() {
    let client = memory_client();
    let (owner, category, restaurant) = seed_catalog(&client).await;

    let updated = update_restaurant(
        &client,
        &restaurant.id,
        RestaurantPatch {
            name: Some("Pho Corner Express".into()),
            ..RestaurantPatch::default()
        },
    )
    .await
    .expect("update");

    assert_eq!(updated.name, "Pho Corner Express");
    assert_eq!(updated.address, restaurant.address);
    assert_eq!(updated.phone, restaurant.phone);
    assert_eq!(updated.owner_id, owner.id);
    assert_eq!(updated.category_id, category.id);
    assert_eq!(updated.created_at, restaurant.created_at);
    assert!(updated.updated_at >= restaurant.updated_at);
}

#[tokio::test]
async fn nullable_patch_clears_field() {
    let client = memory_client();
    let users = client.collection::<User>();
    let user = seed_user(&client, "alice", Role::Customer).await;
    users
        .update(
            &user.id,
            UserPatch {
                full_name: Some(Some("Alice Liddell".into())),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();

    let patch: UserPatch = serde_json::from_value(json!({"full_name": null})).unwrap();
    let cleared = users.update(&user.id, patch).await.unwrap();
    assert_eq!(cleared.full_name, None);
    assert_eq!(cleared.password_hash, user.password_hash);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let client = memory_client();
    let posts = client.collection::<Post>();

    assert!(posts.get("nothingHere").await.unwrap().is_none());
    assert!(posts.get_or_error("nothingHere").await.unwrap_err().is_not_found());
    assert!(posts.delete("nothingHere").await.unwrap_err().is_not_found());
    assert!(
        posts
            .update("nothingHere", platewise::models::PostPatch {
                title: Some("New".into()),
                ..Default::default()
            })
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn references_must_exist() {
    let client = memory_client();
    let err = client
        .collection::<Post>()
        .create(PostInput {
            author_id: "ghostAuthor".into(),
            restaurant_id: None,
            title: "Orphan".into(),
            content: "no author".into(),
            images: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn restaurant_owner_needs_owner_role() {
    let client = memory_client();
    let customer = seed_user(&client, "diner", Role::Customer).await;
    let category = seed_category(&client, "Bakery").await;

    let err = create_restaurant(
        &client,
        RestaurantInput {
            owner_id: customer.id.clone(),
            category_id: category.id.clone(),
            name: "Crumbs".into(),
            address: "1 Flour Lane".into(),
            phone: "555 0199".into(),
            description: String::new(),
            avatar: None,
            images: Vec::new(),
        },
    )
    .await
    .unwrap_err();
    let RepoError::Validation(validation) = err else {
        panic!("expected validation error");
    };
    assert_eq!(validation.issues[0].field, "owner_id");
    assert_eq!(validation.issues[0].code, "validation.role");
}

#[tokio::test]
async fn owner_cannot_be_demoted_while_owning_restaurants() {
    let client = memory_client();
    let (owner, _category, restaurant) = seed_catalog(&client).await;
    let demote = || UserPatch {
        role: Some(Role::Customer),
        ..UserPatch::default()
    };

    let err = update_user(&client, &owner.id, demote()).await.unwrap_err();
    let RepoError::Restricted { collection, dependents, .. } = err else {
        panic!("expected restricted error");
    };
    assert_eq!(collection, "users");
    assert_eq!(dependents, "restaurants");

    let renamed = update_user(
        &client,
        &owner.id,
        UserPatch {
            full_name: Some(Some("Still An Owner".into())),
            role: Some(Role::Admin),
            ..UserPatch::default()
        },
    )
    .await
    .expect("admins may own restaurants");
    assert_eq!(renamed.role, Role::Admin);

    client.collection::<Restaurant>().delete(&restaurant.id).await.unwrap();
    let demoted = update_user(&client, &owner.id, demote()).await.expect("no restaurants left");
    assert_eq!(demoted.role, Role::Customer);
}

#[tokio::test]
async fn login_accepts_username_or_email() {
    let client = memory_client();
    let user = seed_user(&client, "alice", Role::Customer).await;

    let by_name = login(
        &client,
        &LoginRequest {
            identifier: "alice".into(),
            password: PASSWORD.into(),
        },
    )
    .await
    .expect("login by username");
    assert_eq!(by_name.id, user.id);

    let by_email = login(
        &client,
        &LoginRequest {
            identifier: "Alice@Example.com".into(),
            password: PASSWORD.into(),
        },
    )
    .await
    .expect("login by email");
    assert_eq!(by_email.id, user.id);

    let wrong = login(
        &client,
        &LoginRequest {
            identifier: "alice".into(),
            password: "not the password".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(RepoError::Unauthorized { .. })));

    client
        .collection::<User>()
        .update(
            &user.id,
            UserPatch {
                active: Some(false),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();
    let disabled = login(
        &client,
        &LoginRequest {
            identifier: "alice".into(),
            password: PASSWORD.into(),
        },
    )
    .await;
    assert!(matches!(disabled, Err(RepoError::Unauthorized { .. })));
}
