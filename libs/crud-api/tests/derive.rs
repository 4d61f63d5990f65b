mod common;

use crud_api::{
    Args, CrudError, FieldKind, FieldType, Record, Row, Uuid, Value, decode, resolve, set_field,
};

use common::{UserInput, UserOutput, user_id};

#[derive(Debug, Default, Record)]
struct Account {
    #[crud(column = "account_id")]
    id: i64,
    #[crud(column = "balance")]
    balance: f64,
    #[crud(column = "active")]
    active: bool,
    #[crud(column = "owner_id")]
    owner: Option<Uuid>,
    #[crud(column = "version", read_only)]
    version: u32,
    #[crud(skip, column = "ignored")]
    cache: Vec<u8>,
}

#[derive(Args)]
struct Lookup<'a> {
    name: &'a str,
    min_age: Option<i16>,
    owner: Uuid,
}

#[test]
fn shape_is_available_without_an_instance() {
    let shape = Account::shape().unwrap();
    let declared: Vec<_> = shape
        .fields()
        .iter()
        .map(|f| (f.name(), f.field_type(), f.column()))
        .collect();
    assert_eq!(
        declared,
        vec![
            ("id", FieldType::required(FieldKind::I64), Some("account_id")),
            ("balance", FieldType::required(FieldKind::F64), Some("balance")),
            ("active", FieldType::required(FieldKind::Bool), Some("active")),
            ("owner", FieldType::optional(FieldKind::Uuid), Some("owner_id")),
            ("version", FieldType::required(FieldKind::U32), Some("version")),
            ("cache", FieldType::opaque("Vec<u8>"), None),
        ]
    );
}

#[test]
fn end_to_end_row() {
    let mapping = resolve::<UserOutput, _>(&["id", "name", "age"]).unwrap();
    let mut user = UserOutput::default();
    decode(
        &mut user,
        Row(vec![
            Value::from(user_id().as_bytes().as_slice()),
            Value::from("John Doe"),
            Value::Int64(30),
        ]),
        &mapping,
    )
    .unwrap();
    assert_eq!(user.id, user_id());
    assert_eq!(user.name, "John Doe");
    assert_eq!(user.age, 30);
    assert_eq!(user.fk, None);
}

#[test]
fn integer_cells_fill_float_fields() {
    let mapping = resolve::<Account, _>(&["balance", "active", "account_id"]).unwrap();
    let mut account = Account::default();
    decode(
        &mut account,
        Row(vec![Value::Int64(100), Value::Bool(true), Value::Int64(12)]),
        &mapping,
    )
    .unwrap();
    assert_eq!(account.balance, 100.0);
    assert!(account.active);
    assert_eq!(account.id, 12);
}

#[test]
fn read_only_and_skipped_fields() {
    let mut account = Account::default();
    let err = set_field(&mut account, "version", Value::Int64(2)).unwrap_err();
    assert!(matches!(err, CrudError::FieldNotSettable { ref field } if field == "version"));
    assert_eq!(account.version, 0);

    let mapping = resolve::<Account, _>(&["ignored"]).unwrap();
    assert_eq!(mapping.field_names(), vec![None]);
    decode(&mut account, Row(vec![Value::from(vec![1u8])]), &mapping).unwrap();
    assert!(account.cache.is_empty());
}

#[test]
fn args_follow_declaration_order() {
    let owner = user_id();
    let lookup = Lookup {
        name: "John Doe",
        min_age: None,
        owner,
    };
    assert_eq!(
        lookup.arguments(),
        vec![Value::from("John Doe"), Value::Null, Value::Uuid(owner)]
    );

    let input = UserInput {
        name: "Jane".to_string(),
        age: 41,
        request_id: 1,
    };
    assert_eq!(
        input.arguments(),
        vec![Value::from("Jane"), Value::Int64(41)]
    );
}
