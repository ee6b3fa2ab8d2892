mod common;

use std::sync::Arc;

use anyhow::{bail, Result as AnyResult};
use common::{address, hash, head, vm_output, MockDriver};
use connex_common::api::{
    thor::{
        ClauseInput, Event, EventCriteria, FilterRange, Order, RangeUnit, Revision,
        TransferCriteria,
    },
    Quantity,
};
use connex_framework::{
    config::FrameworkConfig,
    error::FrameworkError,
    thor::{AbiEvent, AbiFunction, Thor},
};
use serde_json::{json, Value};

fn bad_parameter(err: FrameworkError) -> String {
    match err {
        FrameworkError::BadParameter(e) => e.to_string(),
        other => panic!("expected bad parameter, got {:?}", other),
    }
}

// balanceOf(address) returning a single uint256
struct BalanceOf;

impl AbiFunction for BalanceOf {
    fn input_count(&self) -> usize {
        1
    }

    fn encode(&self, args: &[Value]) -> AnyResult<String> {
        match args[0].as_str() {
            Some(addr) if addr.len() == 42 => Ok(format!("0x70a08231{:0>64}", &addr[2..])),
            _ => bail!("invalid address argument"),
        }
    }

    fn decode(&self, data: &str) -> AnyResult<Value> {
        Ok(json!({ "0": data }))
    }
}

const TRANSFER_TOPIC: &str = "0xDDF252AD1BE2C89B69C2B068FC378DAA952BA7F163C4A11628F55A4DF523B3EF";

fn address_topic(addr: &str) -> String {
    format!("0x{:0>64}", &addr[2..])
}

// Transfer(address indexed from, address indexed to, uint256 value)
struct TransferEvent;

impl AbiEvent for TransferEvent {
    fn encode_criteria(&self, indexed: &Value) -> AnyResult<EventCriteria> {
        let topic = |key: &str| -> AnyResult<Option<String>> {
            match indexed.get(key) {
                None => Ok(None),
                Some(Value::String(addr)) if addr.len() == 42 => Ok(Some(address_topic(addr))),
                Some(_) => bail!("invalid indexed parameter '{}'", key),
            }
        };

        Ok(EventCriteria {
            topic0: Some(TRANSFER_TOPIC.to_owned()),
            topic1: topic("from")?,
            topic2: topic("to")?,
            ..Default::default()
        })
    }

    fn decode(&self, data: &str, topics: &[String]) -> AnyResult<Value> {
        match topics {
            [_, from, to] => Ok(json!({ "from": from, "to": to, "value": data })),
            _ => bail!("expected 3 topics, got {}", topics.len()),
        }
    }
}

#[tokio::test]
async fn test_filter_limit() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());

    let filter = thor.filter_events();
    let err = filter.apply(0, 300).await.unwrap_err();
    assert_eq!(bad_parameter(err), "arg1 expected integer in [0, 256]");
    assert!(driver.filters().is_empty());

    filter.apply(0, 10).await.unwrap();
    let filters = driver.filters();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0]["options"], json!({"offset": 0, "limit": 10}));
    assert_eq!(
        filters[0]["range"],
        json!({"unit": "block", "from": 0, "to": 4294967295u64})
    );
    assert_eq!(filters[0]["order"], json!("asc"));
}

#[tokio::test]
async fn test_filter_body() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());

    let criteria = TransferCriteria {
        sender: Some(address("AB")),
        ..Default::default()
    };
    let filter = thor
        .filter_transfers()
        .criteria(vec![criteria])
        .unwrap()
        .range(FilterRange {
            unit: RangeUnit::Time,
            from: 1_530_014_400,
            to: 1_540_014_400,
        })
        .unwrap()
        .order(Order::Desc);

    filter.apply(20, 5).await.unwrap();
    let body = &driver.filters()[0];
    assert_eq!(body["criteriaSet"], json!([{ "sender": address("ab") }]));
    assert_eq!(body["range"]["unit"], json!("time"));
    assert_eq!(body["options"], json!({"offset": 20, "limit": 5}));
    assert_eq!(body["order"], json!("desc"));
}

#[tokio::test]
async fn test_bad_parameters_never_reach_driver() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());

    let err = thor.account("0x1234").err().unwrap();
    assert_eq!(bad_parameter(err), "addr expected address");

    let err = thor.transaction("0xzz").err().unwrap();
    assert_eq!(bad_parameter(err), "id expected bytes32");

    let err = thor.block(Some(Revision::from("0x01"))).err().unwrap();
    assert_eq!(bad_parameter(err), "revision expected bytes32");

    let account = thor.account(&address("aa")).unwrap();
    let err = account.get_storage("0x01").await.unwrap_err();
    assert_eq!(bad_parameter(err), "key expected bytes32");

    let criteria = EventCriteria {
        address: Some("0xnope".to_owned()),
        ..Default::default()
    };
    let err = thor.filter_events().criteria(vec![criteria]).err().unwrap();
    assert_eq!(bad_parameter(err), "arg0.#0.address expected address");

    let range = FilterRange {
        unit: RangeUnit::Block,
        from: 0,
        to: u64::MAX,
    };
    let err = thor.filter_events().range(range).err().unwrap();
    assert_eq!(bad_parameter(err), "arg0.to expected non-neg safe integer");

    let err = thor.explain().caller("0x00").err().unwrap();
    assert_eq!(bad_parameter(err), "caller expected address");

    let clause = ClauseInput {
        to: Some(address("cc")),
        value: Quantity::from("1e18"),
        data: None,
    };
    let err = thor.explain().execute(vec![clause]).await.unwrap_err();
    assert_eq!(
        bad_parameter(err),
        "clauses.#0.value expected unsigned integer in number or string"
    );

    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn test_queries_pinned_to_head() {
    let (driver, feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());

    let account = thor.account(&address("AA")).unwrap();
    assert_eq!(account.address(), address("aa"));
    account.get().await.unwrap();

    feed.push(head(3));
    driver.wait_pulls(2).await;

    account.get_code().await.unwrap();
    account.get_storage(&hash(9).to_uppercase().replace("0X", "0x")).await.unwrap();
    thor.transaction(&hash(42)).unwrap().get_receipt().await.unwrap();

    let block = thor.block(None).unwrap();
    assert_eq!(block.revision(), &Revision::Id(hash(3)));
    assert!(block.get().await.unwrap().is_some());
    thor.block(Some(Revision::from(1u32))).unwrap().get().await.unwrap();

    assert_eq!(
        driver.calls(),
        vec![
            format!("get_account {} {}", address("aa"), hash(0)),
            format!("get_code {} {}", address("aa"), hash(3)),
            format!("get_storage {} {} {}", address("aa"), hash(9), hash(3)),
            format!("get_receipt {} {}", hash(42), hash(3)),
            format!("get_block {}", hash(3)),
            "get_block 1".to_owned(),
        ]
    );
}

#[tokio::test]
async fn test_explain_clauses() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());
    *driver.explain_outputs.lock().unwrap() = vec![vm_output("0x", false)];

    let clauses = vec![
        ClauseInput {
            to: Some(address("CC")),
            value: Quantity::from(100u64),
            data: None,
        },
        ClauseInput {
            to: None,
            value: Quantity::from("0x0A"),
            data: Some("0x6080".to_owned()),
        },
    ];
    let outputs = thor
        .explain()
        .caller(&address("BB"))
        .unwrap()
        .gas(50_000)
        .unwrap()
        .cache(&[address("CC").as_str()])
        .unwrap()
        .execute(clauses)
        .await
        .unwrap();
    assert_eq!(outputs.len(), 1);

    let expected_arg = json!({
        "clauses": [
            { "to": address("cc"), "value": "100", "data": "0x" },
            { "to": null, "value": "0x0a", "data": "0x6080" }
        ],
        "caller": address("bb"),
        "gas": 50000
    });
    assert_eq!(
        driver.calls(),
        vec![format!(
            "explain {} {} {:?}",
            expected_arg,
            hash(0),
            Some(vec![address("cc")])
        )]
    );
}

#[tokio::test]
async fn test_method_call() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());
    let balance = format!("0x{:064x}", 1000);
    *driver.explain_outputs.lock().unwrap() = vec![vm_output(&balance, false)];

    let method = thor
        .account(&address("ee"))
        .unwrap()
        .method(Arc::new(BalanceOf));

    let err = method.as_clause(&[]).unwrap_err();
    assert_eq!(bad_parameter(err), "args expected 1 argument(s), got 0");
    let err = method.as_clause(&[json!(1)]).unwrap_err();
    assert_eq!(bad_parameter(err), "args invalid address argument");

    let method = method.value(5u64).unwrap();
    let clause = method.as_clause(&[json!(address("11"))]).unwrap();
    assert_eq!(clause.to, Some(address("ee")));
    assert_eq!(clause.value, "5");
    assert!(clause.data.starts_with("0x70a08231"));

    let output = method.call(&[json!(address("11"))]).await.unwrap();
    assert_eq!(output.decoded, Some(json!({ "0": balance })));

    // reverted output is returned without decoding
    *driver.explain_outputs.lock().unwrap() = vec![vm_output("0x", true)];
    let output = method.call(&[json!(address("11"))]).await.unwrap();
    assert!(output.reverted);
    assert_eq!(output.decoded, None);

    *driver.explain_outputs.lock().unwrap() = vec![];
    let err = method.call(&[json!(address("11"))]).await.unwrap_err();
    assert!(matches!(err, FrameworkError::EmptyOutput));
}

#[tokio::test]
async fn test_event_criteria() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());
    let event = thor
        .account(&address("EE"))
        .unwrap()
        .event(Arc::new(TransferEvent));

    let criteria = event
        .as_criteria(&[json!({ "from": address("11") }), json!({ "to": address("22") })])
        .unwrap();
    assert_eq!(
        criteria,
        vec![
            EventCriteria {
                address: Some(address("ee")),
                topic0: Some(TRANSFER_TOPIC.to_owned()),
                topic1: Some(address_topic(&address("11"))),
                ..Default::default()
            },
            EventCriteria {
                address: Some(address("ee")),
                topic0: Some(TRANSFER_TOPIC.to_owned()),
                topic2: Some(address_topic(&address("22"))),
                ..Default::default()
            },
        ]
    );

    let err = event
        .as_criteria(&[json!({}), json!({ "to": 1 })])
        .unwrap_err();
    assert_eq!(bad_parameter(err), "arg0.#1 invalid indexed parameter 'to'");

    // no indexed parameter matches every emission of the event
    let filter = event.filter(&[]).unwrap();
    assert_eq!(
        filter.body().criteria_set,
        vec![EventCriteria {
            address: Some(address("ee")),
            topic0: Some(TRANSFER_TOPIC.to_lowercase()),
            ..Default::default()
        }]
    );
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn test_event_filter_decodes_logs() {
    let (driver, _feed) = MockDriver::long_poll();
    let thor = Thor::new(driver.clone(), &FrameworkConfig::default());
    let event = thor
        .account(&address("ee"))
        .unwrap()
        .event(Arc::new(TransferEvent));

    let topics = vec![
        TRANSFER_TOPIC.to_lowercase(),
        address_topic(&address("11")),
        address_topic(&address("22")),
    ];
    *driver.events.lock().unwrap() = vec![Event {
        address: address("ee"),
        topics: topics.clone(),
        data: hash(1000),
        meta: None,
        decoded: None,
    }];

    let filter = event
        .filter(&[json!({ "from": address("11") })])
        .unwrap()
        .range(FilterRange {
            unit: RangeUnit::Block,
            from: 10,
            to: 20,
        })
        .unwrap()
        .order(Order::Desc);
    let events = filter.apply(0, 5).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].decoded,
        Some(json!({ "from": topics[1], "to": topics[2], "value": hash(1000) }))
    );

    let body = &driver.filters()[0];
    assert_eq!(body["criteriaSet"][0]["topic1"], json!(topics[1]));
    assert_eq!(body["range"], json!({"unit": "block", "from": 10, "to": 20}));
    assert_eq!(body["order"], json!("desc"));

    // logs the ABI can't make sense of fail the whole page
    driver.events.lock().unwrap()[0].topics.truncate(1);
    let err = filter.apply(0, 5).await.unwrap_err();
    assert!(matches!(err, FrameworkError::Decode(_)));
}
