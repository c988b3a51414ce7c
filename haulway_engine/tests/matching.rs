use chrono::{Duration, Utc};
use haulway_engine::{
    db_types::{BaggageType, DealActuality, DealStatus, NewOffer},
    events::EventProducers,
    DealFlowApi,
    DealQueryFilter,
    MatchingApi,
    ParcelLinkApi,
    SearchCriteria,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

mod support;
use support::{deal_fixture, milan, naples, parcel_fixture, prepare_test_env, random_db_path, rome};

#[test]
fn departure_search_filters_by_distance_and_baggage() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let matching = MatchingApi::new(db);

        let start = Utc::now() + Duration::days(3);
        let from_rome = deals.create_deal(deal_fixture("t-100", start)).await.unwrap();
        let mut northbound = deal_fixture("t-200", start);
        northbound.address_from = "Milan".to_string();
        northbound.address_to = "Rome".to_string();
        northbound.location_from = milan();
        northbound.location_to = rome();
        deals.create_deal(northbound).await.unwrap();

        // Naples is about 190 km from Rome and almost 700 km from Milan.
        let nearby = matching.find_compatible_deals(&SearchCriteria::new(naples(), 250.0)).await.unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].id, from_rome.id);

        // Shrink the radius and nothing is in range. An empty answer is not an error.
        let none = matching.find_compatible_deals(&SearchCriteria::new(naples(), 50.0)).await.unwrap();
        assert!(none.is_empty());

        // The Rome deal carries small boxes and suitcases, not furniture.
        let furniture = SearchCriteria::new(naples(), 250.0).with_baggage_type(BaggageType::Furniture);
        assert!(matching.find_compatible_deals(&furniture).await.unwrap().is_empty());
        let boxes = SearchCriteria::new(naples(), 250.0).with_baggage_type(BaggageType::SmallBox);
        assert_eq!(matching.find_compatible_deals(&boxes).await.unwrap().len(), 1);

        // A departure cutoff after the deal's start date excludes it.
        let too_late = SearchCriteria::new(naples(), 250.0).departing_after(start + Duration::days(1));
        assert!(matching.find_compatible_deals(&too_late).await.unwrap().is_empty());
    });
}

#[test]
fn the_departure_bound_is_exclusive() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let matching = MatchingApi::new(db);

        let deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();

        // A deal departing exactly at the bound is not "after" it.
        let at_bound = SearchCriteria::new(rome(), 50.0).departing_after(deal.start_date);
        assert!(matching.find_compatible_deals(&at_bound).await.unwrap().is_empty());

        let just_before = SearchCriteria::new(rome(), 50.0).departing_after(deal.start_date - Duration::seconds(1));
        assert_eq!(matching.find_compatible_deals(&just_before).await.unwrap().len(), 1);
    });
}

#[test]
fn archived_deals_never_match() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let matching = MatchingApi::new(db);

        let deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let criteria = SearchCriteria::new(rome(), 50.0);
        assert_eq!(matching.find_compatible_deals(&criteria).await.unwrap().len(), 1);

        deals.transporter_cancels_deal(&deal.id).await.unwrap();
        assert!(matching.find_compatible_deals(&criteria).await.unwrap().is_empty());
    });
}

#[test]
fn parcel_driven_search_uses_the_parcel_profile() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let parcels = ParcelLinkApi::new(db.clone());
        let matching = MatchingApi::new(db);

        // Departs after the parcel's date and carries small boxes: a match.
        let compatible = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        // Departs before the parcel is ready.
        let mut early = deal_fixture("t-200", Utc::now() + Duration::days(1));
        early.baggage_types = vec![BaggageType::SmallBox];
        deals.create_deal(early).await.unwrap();

        let parcel = parcels.create_parcel(parcel_fixture("c-1")).await.unwrap();
        let found = matching.find_deals_for_parcel(&parcel, 50.0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, compatible.id);
    });
}

#[test]
fn attribute_search_browses_the_listing() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let matching = MatchingApi::new(db);

        let first = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let second = deals.create_deal(deal_fixture("t-200", Utc::now() + Duration::days(4))).await.unwrap();
        deals.transporter_cancels_deal(&second.id).await.unwrap();

        let mine = matching.search_deals(DealQueryFilter::default().with_transporter_id("t-100".to_string())).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.id);

        let active = matching.search_deals(DealQueryFilter::active_only()).await.unwrap();
        assert_eq!(active.len(), 1);

        let cancelled =
            matching.search_deals(DealQueryFilter::default().with_status(DealStatus::DealIsCancel)).await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, second.id);

        // No filters at all returns everything, departure-ordered.
        let all = matching.search_deals(DealQueryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
    });
}

#[test]
fn client_centric_queries() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let deals = DealFlowApi::new(db.clone(), EventProducers::default());
        let parcels = ParcelLinkApi::new(db.clone());
        let matching = MatchingApi::new(db);

        let active_deal = deals.create_deal(deal_fixture("t-100", Utc::now() + Duration::days(3))).await.unwrap();
        let doomed_deal = deals.create_deal(deal_fixture("t-200", Utc::now() + Duration::days(4))).await.unwrap();

        let parcel = parcels.create_parcel(parcel_fixture("c-1")).await.unwrap();
        let subscription =
            parcels.subscribe_parcels_as_client(&active_deal.id, "c-1", &[parcel.id.clone()]).await.unwrap();
        let live_offer = subscription.subscribed[0].offer.clone();

        deals
            .insert_offer(&doomed_deal.id, NewOffer::client_initiated("c-1", None, 900.into()))
            .await
            .unwrap();
        deals.transporter_cancels_deal(&doomed_deal.id).await.unwrap();

        let active = matching.my_offers("c-1", DealActuality::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0, active_deal.id);
        assert_eq!(active[0].1.id, live_offer.id);

        let archived = matching.my_offers("c-1", DealActuality::Archived).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].0, doomed_deal.id);

        let found = matching.find_offer(&live_offer.id).await.unwrap();
        assert_eq!(found, Some((active_deal.id.clone(), live_offer)));

        let by_parcel =
            matching.search_deals(DealQueryFilter::default().with_parcel_id(parcel.id.clone())).await.unwrap();
        assert_eq!(by_parcel.len(), 1);
        assert_eq!(by_parcel[0].id, active_deal.id);

        let involving_client =
            matching.search_deals(DealQueryFilter::default().with_client_id("c-1".to_string())).await.unwrap();
        assert_eq!(involving_client.len(), 2);
    });
}
