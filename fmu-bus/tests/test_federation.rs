//! Federation-level tests: value delivery, data links and lock-step time grants.

use std::time::Duration;

use fmu_bus::{
    BrokerApp, CoreApp, FederateInfo, IterationRequest, Time, TimeProperty, ValueFederate,
};

fn info_for(core: &CoreApp) -> FederateInfo {
    FederateInfo {
        core_name: core.identifier(),
        period: Some(Time::from_secs_f64(0.1)),
        ..Default::default()
    }
}

#[test]
fn test_two_federate_exchange() {
    let core = CoreApp::new("inproc", "--name exchange-core").unwrap();
    assert!(core.connect());

    let info = info_for(&core);
    let mut producer = ValueFederate::new("producer", &info).unwrap();
    let mut consumer = ValueFederate::new("consumer", &info).unwrap();

    let out = producer.register_publication("signal");
    let sub = consumer.register_subscription("signal");
    consumer.set_default(&sub, -1.0);

    let producer_thread = std::thread::spawn(move || {
        producer.enter_initializing_mode().unwrap();
        producer.publish(&out, 0.0);
        producer
            .enter_executing_mode(IterationRequest::IterateIfNeeded)
            .unwrap();
        for step in 1..=5 {
            producer.publish(&out, step as f64);
            let granted = producer.request_next_step();
            assert_eq!(granted, Time::from_secs_f64(0.1 * step as f64));
        }
        producer.finalize();
    });

    consumer.enter_initializing_mode().unwrap();
    consumer
        .enter_executing_mode(IterationRequest::IterateIfNeeded)
        .unwrap();
    let mut last = -1.0;
    for _ in 1..=5 {
        consumer.request_next_step();
        let value = consumer.get_value(&sub);
        assert!(value >= last, "published values arrive monotonically");
        last = value;
    }
    consumer.finalize();
    producer_thread.join().unwrap();
    assert_eq!(last, 5.0);

    core.force_terminate();
}

#[test]
fn test_data_link_routing() {
    let core = CoreApp::new("inproc", "--name link-core").unwrap();
    assert!(core.connect());
    core.data_link("pub0", "sink.input_a");

    let info = info_for(&core);
    let mut source = ValueFederate::new("source", &info).unwrap();
    let mut sink = ValueFederate::new("sink", &info).unwrap();

    let pub0 = source.register_global_publication("pub0");
    let input_a = sink.register_subscription("input_a");
    sink.set_default(&input_a, 0.0);

    source.publish(&pub0, 13.56);
    assert_eq!(sink.get_value(&input_a), 13.56);

    // without a link or a matching publication the default is delivered
    let input_b = sink.register_subscription("input_b");
    sink.set_default(&input_b, 7.5);
    assert_eq!(sink.get_value(&input_b), 7.5);

    source.finalize();
    sink.finalize();
    core.force_terminate();
}

#[test]
fn test_termination_unblocks_federates() {
    let core = CoreApp::new("inproc", "--name term-core").unwrap();
    assert!(core.connect());

    let info = info_for(&core);
    let mut lonely = ValueFederate::new("lonely", &info).unwrap();
    let mut other = ValueFederate::new("other", &info).unwrap();

    let terminator = {
        let core = core.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            core.force_terminate();
        })
    };

    // `other` never joins the barrier, so only termination can release `lonely`
    assert!(lonely.enter_initializing_mode().is_err());
    terminator.join().unwrap();
    assert_eq!(lonely.request_next_step(), Time::MAX);

    other.finalize();
    lonely.finalize();
}

#[test]
fn test_broker_core_disconnect() {
    let broker = BrokerApp::new("inproc", "--name federation-broker").unwrap();
    assert!(broker.connect());

    let init = format!("--name disco-core --broker {}", broker.address());
    let core = CoreApp::new("inproc", &init).unwrap();
    assert!(core.connect());
    assert!(!broker.wait_for_disconnect(Some(Duration::from_millis(1))));

    let mut info = info_for(&core);
    info.set_time_property(TimeProperty::Period, Time::from_secs_f64(0.5));
    let mut fed = ValueFederate::new("only", &info).unwrap();
    fed.enter_initializing_mode().unwrap();
    fed.enter_executing_mode(IterationRequest::NoIterations)
        .unwrap();
    assert_eq!(fed.request_next_step(), Time::from_secs_f64(0.5));
    fed.finalize();

    // the last federate leaving disconnects the core, which detaches from the broker
    assert!(core.wait_for_disconnect(Some(Duration::from_millis(100))));
    assert!(broker.wait_for_disconnect(Some(Duration::from_millis(100))));
}
