//! The production write path: resolve the theatre and write the production
//! with attribution, as one store transaction.
//!
//! Callers check the access policy first; these functions assume the actor is
//! permitted.

use tracing::info;
use uuid::Uuid;

use crate::{
  production::{
    NewProduction, Production, ProductionDraft, ProductionUpdate, ProductionView, slugify,
  },
  resolver::{attribute, claim_for},
  store::MarqueeStore,
  theatre::TheatreAttributes,
  user::User,
};

/// Create a production and, if needed, its theatre. `creator` and `updater`
/// of the new production are both `actor`.
pub async fn create_production<S: MarqueeStore>(
  store: &S,
  actor: &User,
  draft: ProductionDraft<TheatreAttributes>,
) -> Result<ProductionView, S::Error> {
  let (production, claim) = store
    .create_production(NewProduction {
      url:        slugify(&draft.title),
      theatre:    claim_for(&draft.theatre, actor),
      title:      draft.title,
      details:    draft.details,
      creator_id: actor.user_id,
    })
    .await?;
  let resolution = attribute(claim, actor, None);

  info!(
    production_id = %production.production_id,
    theatre_id = %production.theatre_id,
    actor = %actor.user_id,
    "production created"
  );

  Ok(ProductionView { production, theatre: resolution.theatre })
}

/// Apply an edit. A submitted theatre name may switch the production to a
/// different (possibly new) theatre; the old theatre is left as it is.
///
/// Returns `None` if the production does not exist.
pub async fn update_production<S: MarqueeStore>(
  store: &S,
  actor: &User,
  production_id: Uuid,
  draft: ProductionDraft<Option<TheatreAttributes>>,
) -> Result<Option<ProductionView>, S::Error> {
  let Some(current) = store.get_production(production_id).await? else {
    return Ok(None);
  };

  let Some((production, claim)) = store
    .update_production(production_id, ProductionUpdate {
      url: slugify(&draft.title),
      theatre: draft.theatre.as_ref().map(|attrs| claim_for(attrs, actor)),
      title: draft.title,
      details: draft.details,
      updater_id: actor.user_id,
    })
    .await?
  else {
    return Ok(None);
  };

  info!(%production_id, actor = %actor.user_id, "production updated");

  match claim {
    Some(claim) => {
      let resolution = attribute(claim, actor, Some(current.theatre_id));
      if let Some(previous) = resolution.replaced {
        info!(%production_id, from = %previous, to = %resolution.theatre.theatre_id, "production moved theatre");
      }
      Ok(Some(ProductionView { production, theatre: resolution.theatre }))
    }
    None => view_production(store, production).await,
  }
}

/// Bundle a production with its theatre. `None` only if the theatre row is
/// missing, which the store's foreign key prevents.
pub async fn view_production<S: MarqueeStore>(
  store: &S,
  production: Production,
) -> Result<Option<ProductionView>, S::Error> {
  Ok(
    store
      .get_theatre(production.theatre_id)
      .await?
      .map(|theatre| ProductionView { production, theatre }),
  )
}
