//! Process-wide defaults.
//!
//! Kept in its own test binary: the defaults can be installed once per process.

use payload_contract::{
    defaults, set_defaults, Contract, ContractFactory, DefaultsError, DocSchema, Field, Options,
    SchemaDescription,
};

#[test]
fn defaults_install_once_and_reach_every_contract() {
    set_defaults(Options::new().validate_response(true).payload_key("data")).unwrap();

    let err = set_defaults(Options::new().payload_key("other")).unwrap_err();
    assert!(matches!(err, DefaultsError::AlreadyInitialized));
    assert_eq!(defaults().payload_key, "data");

    let description = SchemaDescription::new(DocSchema::new().field("name", Field::string()))
        .response(200, DocSchema::new().field("id", Field::string()));

    let contract = Contract::new(&description, Options::new()).unwrap();
    assert!(contract.options().validate.response);
    assert!(contract.options().filter.request);
    assert_eq!(contract.options().payload_key, "data");

    let overridden = Contract::new(&description, Options::new().validate_response(false)).unwrap();
    assert!(!overridden.options().validate.response);

    let factory = ContractFactory::global();
    assert_eq!(factory.defaults().payload_key, "data");

    // Scoped factories ignore the process-wide defaults
    let scoped = ContractFactory::new(Options::new());
    assert_eq!(scoped.defaults().payload_key, "$key");
    assert!(!scoped.defaults().validate.response);
}
