//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, Utc};
use marquee_core::{
  listing,
  production::{NewProduction, ProductionDetails, ProductionForm, ProductionUpdate},
  store::{MarqueeStore, PageRequest, TheatreStore, UserQuery},
  theatre::{NewTheatre, TheatreAttributes, TheatreClaim, TheatreForm},
  user::{NewUser, ProfileChanges, Rank, User},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str, rank: Rank) -> User {
  s.create_user(NewUser {
    name:              name.into(),
    email:             format!("{}@example.com", name.to_lowercase()),
    rank,
    creator_id:        None,
    password_hash:     Some("hash".into()),
    activation_digest: None,
    activated_at:      Some(Utc::now()),
  })
  .await
  .unwrap()
  .expect("email is free")
}

fn production_form(title: &str, theatre: Option<&str>) -> ProductionForm {
  ProductionForm {
    title: title.into(),
    theatre_attributes: theatre.map(|name| TheatreForm { name: name.into() }),
    ..Default::default()
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Admin).await;

  let fetched = s.get_user(ada.user_id).await.unwrap().unwrap();
  assert_eq!(fetched, ada);
  assert_eq!(fetched.rank, Rank::Admin);
  assert!(fetched.is_activated());

  let by_email = s.find_user_by_email("ada@example.com").await.unwrap();
  assert_eq!(by_email.map(|u| u.user_id), Some(ada.user_id));
}

#[tokio::test]
async fn duplicate_email_is_refused() {
  let s = store().await;
  user(&s, "Ada", Rank::Regular).await;
  let again = s
    .create_user(NewUser {
      name:              "Other Ada".into(),
      email:             "ada@example.com".into(),
      rank:              Rank::Regular,
      creator_id:        None,
      password_hash:     None,
      activation_digest: None,
      activated_at:      None,
    })
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn invited_user_is_attributed_and_unactivated() {
  let s = store().await;
  let admin = user(&s, "Admin", Rank::Admin).await;
  let invited = s
    .create_user(NewUser {
      name:              "Bea".into(),
      email:             "bea@example.com".into(),
      rank:              Rank::Regular,
      creator_id:        Some(admin.user_id),
      password_hash:     None,
      activation_digest: Some("digest".into()),
      activated_at:      None,
    })
    .await
    .unwrap()
    .unwrap();

  assert!(!invited.is_activated());
  assert_eq!(invited.creator_id, Some(admin.user_id));
  assert_eq!(invited.updater_id, Some(admin.user_id));

  let activated = s
    .activate_user(invited.user_id, "new-hash".into())
    .await
    .unwrap()
    .unwrap();
  assert!(activated.is_activated());
  assert_eq!(activated.creator_id, Some(admin.user_id));
  assert_eq!(activated.updater_id, Some(invited.user_id));

  let creds = s.get_credentials(invited.user_id).await.unwrap().unwrap();
  assert_eq!(creds.password_hash.as_deref(), Some("new-hash"));
  assert_eq!(creds.activation_digest, None);
}

#[tokio::test]
async fn reset_digest_round_trip() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;

  assert!(s.set_reset_digest(ada.user_id, "d1".into()).await.unwrap());
  let creds = s.get_credentials(ada.user_id).await.unwrap().unwrap();
  assert_eq!(creds.reset_digest.as_deref(), Some("d1"));
  assert!(creds.reset_sent_at.is_some());

  let after = s.reset_password(ada.user_id, "h2".into()).await.unwrap().unwrap();
  assert_eq!(after.updater_id, Some(ada.user_id));
  let creds = s.get_credentials(ada.user_id).await.unwrap().unwrap();
  assert_eq!(creds.reset_digest, None);
  assert_eq!(creds.password_hash.as_deref(), Some("h2"));

  assert!(!s.set_reset_digest(Uuid::new_v4(), "d".into()).await.unwrap());
}

#[tokio::test]
async fn profile_update_keeps_password_when_absent() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;

  let updated = s
    .update_profile(ada.user_id, ProfileChanges {
      name:          "Ada L".into(),
      email:         "ada.l@example.com".into(),
      password_hash: None,
      updater_id:    ada.user_id,
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.name, "Ada L");
  assert_eq!(updated.email, "ada.l@example.com");
  let creds = s.get_credentials(ada.user_id).await.unwrap().unwrap();
  assert_eq!(creds.password_hash.as_deref(), Some("hash"));
}

#[tokio::test]
async fn rank_and_suspension_are_independent() {
  let s = store().await;
  let root = user(&s, "Root", Rank::SuperAdmin).await;
  let ada = user(&s, "Ada", Rank::Regular).await;

  let promoted = s.set_rank(ada.user_id, Rank::Admin, root.user_id).await.unwrap().unwrap();
  assert_eq!(promoted.rank, Rank::Admin);
  assert_eq!(promoted.rank_assigned_by, Some(root.user_id));
  assert!(!promoted.suspended);

  let suspended = s.set_suspended(ada.user_id, true).await.unwrap().unwrap();
  assert!(suspended.suspended);
  assert_eq!(suspended.rank, Rank::Admin);
}

#[tokio::test]
async fn user_listing_respects_visibility() {
  let s = store().await;
  let root = user(&s, "Root", Rank::SuperAdmin).await;
  let other_root = user(&s, "Zed", Rank::SuperAdmin).await;
  let admin = user(&s, "Admin", Rank::Admin).await;
  let peer = user(&s, "Peer", Rank::Admin).await;
  let regular = user(&s, "Bea", Rank::Regular).await;

  let as_root = s
    .list_users(UserQuery {
      visible_to: Some((root.user_id, root.rank)),
      page:       PageRequest::default(),
    })
    .await
    .unwrap();
  let ids: Vec<Uuid> = as_root.items.iter().map(|u| u.user_id).collect();
  assert_eq!(as_root.total, 4);
  assert!(ids.contains(&root.user_id));
  assert!(ids.contains(&admin.user_id));
  assert!(ids.contains(&peer.user_id));
  assert!(ids.contains(&regular.user_id));
  assert!(!ids.contains(&other_root.user_id));

  let as_admin = s
    .list_users(UserQuery {
      visible_to: Some((admin.user_id, admin.rank)),
      page:       PageRequest::default(),
    })
    .await
    .unwrap();
  let names: Vec<&str> = as_admin.items.iter().map(|u| u.name.as_str()).collect();
  assert_eq!(names, ["Admin", "Bea"]);
}

#[tokio::test]
async fn user_listing_paginates() {
  let s = store().await;
  for i in 0..35 {
    user(&s, &format!("User{i:02}"), Rank::Regular).await;
  }
  let second = s
    .list_users(UserQuery { visible_to: None, page: PageRequest::new(2, 30) })
    .await
    .unwrap();
  assert_eq!(second.total, 35);
  assert_eq!(second.items.len(), 5);
  assert!(second.is_paginated());
  assert_eq!(second.items[0].name, "User30");
}

#[tokio::test]
async fn deleting_a_user_nulls_attribution() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let draft = production_form("Hamlet", Some("Globe")).parse_new().unwrap();
  let view = listing::create_production(&s, &ada, draft).await.unwrap();

  assert!(s.delete_user(ada.user_id).await.unwrap());
  assert!(s.get_user(ada.user_id).await.unwrap().is_none());

  let production = s.get_production(view.production.production_id).await.unwrap().unwrap();
  assert_eq!(production.creator_id, None);
  let theatre = s.get_theatre(view.theatre.theatre_id).await.unwrap().unwrap();
  assert_eq!(theatre.creator_id, None);
}

// ─── Theatres ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn claim_is_atomic_on_name() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let bea = user(&s, "Bea", Rank::Regular).await;

  let first = s
    .claim_theatre(NewTheatre { name: "Globe".into(), creator_id: ada.user_id })
    .await
    .unwrap();
  let second = s
    .claim_theatre(NewTheatre { name: "Globe".into(), creator_id: bea.user_id })
    .await
    .unwrap();

  let TheatreClaim::Created(created) = first else { panic!("expected Created") };
  let TheatreClaim::Existing(existing) = second else { panic!("expected Existing") };
  assert_eq!(created.theatre_id, existing.theatre_id);
  assert_eq!(existing.creator_id, Some(ada.user_id));
  assert_eq!(s.list_theatres(PageRequest::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn concurrent_submissions_share_one_theatre() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let bea = user(&s, "Bea", Rank::Regular).await;

  let (a, b) = tokio::join!(
    listing::create_production(
      &s,
      &ada,
      production_form("Hamlet", Some("Globe")).parse_new().unwrap()
    ),
    listing::create_production(
      &s,
      &bea,
      production_form("Macbeth", Some("Globe")).parse_new().unwrap()
    ),
  );
  let (a, b) = (a.unwrap(), b.unwrap());

  assert_eq!(a.theatre.theatre_id, b.theatre.theatre_id);
  assert_eq!(s.list_theatres(PageRequest::default()).await.unwrap().total, 1);
  assert_eq!(s.theatre_productions(a.theatre.theatre_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn theatre_name_lookup_is_exact() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  s.claim_theatre(NewTheatre { name: "Globe".into(), creator_id: ada.user_id })
    .await
    .unwrap();

  assert!(s.find_theatre_by_name("Globe").await.unwrap().is_some());
  assert!(s.find_theatre_by_name("globe").await.unwrap().is_none());
}

#[tokio::test]
async fn referenced_theatre_cannot_be_deleted() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let draft = production_form("Hamlet", Some("Globe")).parse_new().unwrap();
  let view = listing::create_production(&s, &ada, draft).await.unwrap();

  assert!(s.delete_theatre(view.theatre.theatre_id).await.is_err());

  assert!(s.delete_production(view.production.production_id).await.unwrap());
  assert!(s.get_theatre(view.theatre.theatre_id).await.unwrap().is_some());
  assert!(s.delete_theatre(view.theatre.theatre_id).await.unwrap());
}

#[tokio::test]
async fn rename_records_updater() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let bea = user(&s, "Bea", Rank::Regular).await;
  let TheatreClaim::Created(globe) = s
    .claim_theatre(NewTheatre { name: "Globe".into(), creator_id: ada.user_id })
    .await
    .unwrap()
  else {
    panic!("expected Created")
  };

  let renamed = s
    .rename_theatre(
      globe.theatre_id,
      TheatreAttributes::parse("Shakespeare's Globe").unwrap(),
      bea.user_id,
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renamed.name, "Shakespeare's Globe");
  assert_eq!(renamed.creator_id, Some(ada.user_id));
  assert_eq!(renamed.updater_id, Some(bea.user_id));
}

// ─── Production write path ───────────────────────────────────────────────────

#[tokio::test]
async fn new_theatre_is_created_with_the_production() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let draft = production_form("Hamlet", Some("Globe")).parse_new().unwrap();

  let view = listing::create_production(&s, &ada, draft).await.unwrap();

  assert_eq!(view.production.url, "hamlet");
  assert_eq!(view.theatre.name, "Globe");
  assert_eq!(view.production.theatre_id, view.theatre.theatre_id);
  for attribution in [
    view.production.creator_id,
    view.production.updater_id,
    view.theatre.creator_id,
    view.theatre.updater_id,
  ] {
    assert_eq!(attribution, Some(ada.user_id));
  }
}

#[tokio::test]
async fn existing_theatre_keeps_its_creator() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let bea = user(&s, "Bea", Rank::Regular).await;

  let first = listing::create_production(
    &s,
    &ada,
    production_form("Hamlet", Some("Globe")).parse_new().unwrap(),
  )
  .await
  .unwrap();
  let second = listing::create_production(
    &s,
    &bea,
    production_form("Macbeth", Some("Globe")).parse_new().unwrap(),
  )
  .await
  .unwrap();

  assert_eq!(first.theatre.theatre_id, second.theatre.theatre_id);
  assert_eq!(second.theatre.creator_id, Some(ada.user_id));
  assert_eq!(second.theatre.updater_id, Some(ada.user_id));
  assert_eq!(second.production.creator_id, Some(bea.user_id));

  let staged = s.theatre_productions(first.theatre.theatre_id).await.unwrap();
  let titles: Vec<&str> = staged.iter().map(|p| p.title.as_str()).collect();
  assert_eq!(titles, ["Hamlet", "Macbeth"]);
}

#[tokio::test]
async fn update_moves_to_new_theatre_and_keeps_old() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let bea = user(&s, "Bea", Rank::Regular).await;

  let created = listing::create_production(
    &s,
    &ada,
    production_form("Hamlet", Some("Globe")).parse_new().unwrap(),
  )
  .await
  .unwrap();
  let id = created.production.production_id;

  let mut form = production_form("Hamlet", Some("Old Vic"));
  form.first_date = NaiveDate::from_ymd_opt(2015, 8, 5);
  let updated = listing::update_production(&s, &bea, id, form.parse_changes().unwrap())
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.theatre.name, "Old Vic");
  assert_eq!(updated.theatre.creator_id, Some(bea.user_id));
  assert_eq!(updated.production.creator_id, Some(ada.user_id));
  assert_eq!(updated.production.updater_id, Some(bea.user_id));
  assert_eq!(updated.production.details.first_date, NaiveDate::from_ymd_opt(2015, 8, 5));

  let old = s.get_theatre(created.theatre.theatre_id).await.unwrap().unwrap();
  assert_eq!(old.name, "Globe");
  assert_eq!(old.creator_id, Some(ada.user_id));
}

#[tokio::test]
async fn update_without_theatre_keeps_association() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let created = listing::create_production(
    &s,
    &ada,
    production_form("Hamlet", Some("Globe")).parse_new().unwrap(),
  )
  .await
  .unwrap();

  let changes = production_form("Hamlet, Prince of Denmark", None).parse_changes().unwrap();
  let updated = listing::update_production(&s, &ada, created.production.production_id, changes)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.theatre.theatre_id, created.theatre.theatre_id);
  assert_eq!(updated.production.url, "hamlet-prince-of-denmark");
}

#[tokio::test]
async fn update_of_missing_production_is_none() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let changes = production_form("Hamlet", Some("Globe")).parse_changes().unwrap();

  let result = listing::update_production(&s, &ada, Uuid::new_v4(), changes).await.unwrap();

  assert!(result.is_none());
  assert!(s.find_theatre_by_name("Globe").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_production_insert_rolls_back_new_theatre() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;

  // The theatre's creator exists but the production's does not, so the
  // production insert fails its foreign key after the theatre is claimed.
  let result = s
    .create_production(NewProduction {
      title:      "Hamlet".into(),
      url:        "hamlet".into(),
      details:    ProductionDetails::default(),
      theatre:    NewTheatre { name: "Globe".into(), creator_id: ada.user_id },
      creator_id: Uuid::new_v4(),
    })
    .await;

  assert!(result.is_err());
  assert!(s.find_theatre_by_name("Globe").await.unwrap().is_none());
}

#[tokio::test]
async fn store_update_of_missing_production_claims_nothing() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;

  let result = s
    .update_production(Uuid::new_v4(), ProductionUpdate {
      title:      "Hamlet".into(),
      url:        "hamlet".into(),
      details:    ProductionDetails::default(),
      theatre:    Some(NewTheatre { name: "Globe".into(), creator_id: ada.user_id }),
      updater_id: ada.user_id,
    })
    .await
    .unwrap();

  assert!(result.is_none());
  assert!(s.find_theatre_by_name("Globe").await.unwrap().is_none());
}

#[tokio::test]
async fn update_claim_reports_reuse_of_existing_theatre() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let hamlet = listing::create_production(
    &s,
    &ada,
    production_form("Hamlet", Some("Globe")).parse_new().unwrap(),
  )
  .await
  .unwrap();
  listing::create_production(
    &s,
    &ada,
    production_form("Othello", Some("Old Vic")).parse_new().unwrap(),
  )
  .await
  .unwrap();

  let (production, claim) = s
    .update_production(hamlet.production.production_id, ProductionUpdate {
      title:      "Hamlet".into(),
      url:        "hamlet".into(),
      details:    ProductionDetails::default(),
      theatre:    Some(NewTheatre { name: "Old Vic".into(), creator_id: ada.user_id }),
      updater_id: ada.user_id,
    })
    .await
    .unwrap()
    .unwrap();

  let Some(TheatreClaim::Existing(old_vic)) = claim else { panic!("expected Existing") };
  assert_eq!(production.theatre_id, old_vic.theatre_id);
  assert_eq!(s.list_theatres(PageRequest::default()).await.unwrap().total, 2);
}

#[tokio::test]
async fn productions_list_by_sort_key() {
  let s = store().await;
  let ada = user(&s, "Ada", Rank::Regular).await;
  let mut tempest = production_form("The Tempest", Some("Globe"));
  tempest.alphabetise = Some("Tempest, The".into());
  listing::create_production(&s, &ada, tempest.parse_new().unwrap()).await.unwrap();
  listing::create_production(
    &s,
    &ada,
    production_form("Othello", Some("Globe")).parse_new().unwrap(),
  )
  .await
  .unwrap();

  let page = s.list_productions(PageRequest::default()).await.unwrap();
  let titles: Vec<&str> = page.items.iter().map(|p| p.title.as_str()).collect();
  assert_eq!(titles, ["Othello", "The Tempest"]);
  assert_eq!(
    page.items[1].details,
    ProductionDetails { alphabetise: Some("Tempest, The".into()), ..Default::default() }
  );
}
