use chrono::{Duration, Utc};
use haulway_engine::{
    db_types::{DealId, DealStatus, OfferOrigin, OfferStatus},
    events::EventProducers,
    traits::SubscriptionRejection,
    DealFlowApi,
    DealMarketError,
    ParcelLinkApi,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

mod support;
use support::{deal_fixture, parcel_fixture, prepare_test_env, random_db_path};

#[test]
fn client_batch_subscription_is_per_parcel() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let parcels = ParcelLinkApi::new(db);

        let deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let mine = parcels.create_parcel(parcel_fixture("c-1")).await.unwrap();
        let linked = parcels.create_parcel(parcel_fixture("c-1")).await.unwrap();
        let theirs = parcels.create_parcel(parcel_fixture("c-2")).await.unwrap();

        // Pre-link one parcel so the batch has to reject it.
        let pre = parcels.subscribe_parcels_as_client(&deal.id, "c-1", &[linked.id.clone()]).await.unwrap();
        assert!(pre.is_complete());

        let ghost = haulway_engine::db_types::ParcelId::from("no-such-parcel");
        let batch = [mine.id.clone(), linked.id.clone(), theirs.id.clone(), ghost.clone()];
        let result = parcels.subscribe_parcels_as_client(&deal.id, "c-1", &batch).await.unwrap();

        assert!(!result.is_complete());
        assert_eq!(result.subscribed.len(), 1);
        assert_eq!(result.subscribed[0].parcel_id, mine.id);
        let offer = &result.subscribed[0].offer;
        assert_eq!(offer.status, OfferStatus::AgreeClient);
        assert_eq!(offer.origin, OfferOrigin::ClientInitiated);
        assert_eq!(offer.client_id, "c-1");
        assert_eq!(offer.parcel_id.as_ref(), Some(&mine.id));
        assert_eq!(offer.amount, mine.declared_value);
        assert_eq!(result.total_priced(), mine.declared_value);

        let reasons = result.rejected.iter().map(|r| (r.parcel_id.clone(), r.reason.clone())).collect::<Vec<_>>();
        assert!(reasons.contains(&(linked.id.clone(), SubscriptionRejection::AlreadyLinked)));
        assert!(reasons.contains(&(theirs.id.clone(), SubscriptionRejection::NotOwner)));
        assert!(reasons.contains(&(ghost, SubscriptionRejection::ParcelNotFound)));

        // The client path writes the back-reference immediately.
        let stored = parcels.fetch_parcel(&mine.id).await.unwrap().unwrap();
        assert_eq!(stored.offer_id.as_ref(), Some(&offer.id));

        // A rejected parcel belonging to someone else is untouched.
        let untouched = parcels.fetch_parcel(&theirs.id).await.unwrap().unwrap();
        assert!(untouched.offer_id.is_none());
    });
}

#[test]
fn transporter_batch_proposes_without_linking() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let parcels = ParcelLinkApi::new(db);

        let deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let parcel = parcels.create_parcel(parcel_fixture("c-3")).await.unwrap();

        let result = parcels.subscribe_parcels_as_transporter(&deal.id, &[parcel.id.clone()]).await.unwrap();
        assert!(result.is_complete());
        let offer = &result.subscribed[0].offer;
        assert_eq!(offer.status, OfferStatus::AgreeShifter);
        assert_eq!(offer.origin, OfferOrigin::TransporterInitiated);
        // The offer is held on behalf of the parcel's owner, priced at its declared value.
        assert_eq!(offer.client_id, "c-3");
        assert_eq!(offer.amount, parcel.declared_value);

        // No back-reference yet: the owner has not accepted anything.
        let stored = parcels.fetch_parcel(&parcel.id).await.unwrap().unwrap();
        assert!(stored.offer_id.is_none());

        // So the same parcel can be proposed again without tripping the link check.
        let again = parcels.subscribe_parcels_as_transporter(&deal.id, &[parcel.id.clone()]).await.unwrap();
        assert!(again.is_complete());
    });
}

#[test]
fn acceptance_completes_the_two_write_link() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let parcels = ParcelLinkApi::new(db);

        let deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let parcel = parcels.create_parcel(parcel_fixture("c-3")).await.unwrap();
        let proposed = parcels.subscribe_parcels_as_transporter(&deal.id, &[parcel.id.clone()]).await.unwrap();
        let offer_id = proposed.subscribed[0].offer.id.clone();

        let outcome = deals.second_side_agrees(&deal.id, &offer_id).await.unwrap();
        assert!(outcome.parcel_linked);
        assert_eq!(outcome.deal.status, DealStatus::BeingFormed);
        assert_eq!(outcome.offer.status, OfferStatus::AgreeAll);

        let stored = parcels.fetch_parcel(&parcel.id).await.unwrap().unwrap();
        assert_eq!(stored.offer_id.as_ref(), Some(&offer_id));

        // The parcel now shows up on the deal's manifest.
        let manifest = parcels.parcels_for_deal(&deal.id).await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].id, parcel.id);
    });
}

#[test]
fn accepting_an_unlinked_offer_has_nothing_to_link() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());

        let deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let offer = deals
            .insert_offer(&deal.id, haulway_engine::db_types::NewOffer::client_initiated("c-1", None, 500.into()))
            .await
            .unwrap();
        let outcome = deals.second_side_agrees(&deal.id, &offer.id).await.unwrap();
        assert!(!outcome.parcel_linked);
        assert_eq!(outcome.offer.status, OfferStatus::AgreeAll);
    });
}

#[test]
fn subscribing_to_a_missing_deal_fails_whole_call() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let parcels = ParcelLinkApi::new(db);

        let parcel = parcels.create_parcel(parcel_fixture("c-1")).await.unwrap();
        let missing = DealId::from("no-such-deal");
        let result = parcels.subscribe_parcels_as_client(&missing, "c-1", &[parcel.id.clone()]).await;
        assert!(matches!(result, Err(DealMarketError::DealNotFound(_))));
    });
}
