use crud_api::{CrudError, Record, Value};
use crud_executor_memory::{MemoryConnection, ResultSet};
use uuid::Uuid;

#[derive(Debug, Default, Record)]
struct Session {
    #[crud(column = "token")]
    token: Uuid,
    #[crud(column = "user_id")]
    user: Option<Uuid>,
}

const QUERY: &str = "SELECT token, user_id FROM sessions WHERE token = $1";

#[test]
fn wrapper_reads_one_row_and_releases_the_cursor() {
    let token = Uuid::new_v4();
    let conn = MemoryConnection::new();
    conn.register(
        QUERY,
        ResultSet::new(["token", "user_id"])
            .with_row([Value::Uuid(token), Value::Null])
            .with_row([Value::Uuid(Uuid::new_v4()), Value::Null]),
    );

    let mut session = Session::default();
    crud_api::run(&conn, QUERY, &vec![Value::Uuid(token)], &mut session).unwrap();

    assert_eq!(session.token, token);
    assert_eq!(session.user, None);
    assert_eq!(conn.rows_read(), 1);
    assert_eq!(conn.open_cursors(), 0);
    assert_eq!(conn.executions()[0].args, vec![Value::Uuid(token)]);
}

#[test]
fn re_registering_replaces_the_result() {
    let conn = MemoryConnection::new();
    conn.register(
        QUERY,
        ResultSet::new(["token"]).with_row([Value::Uuid(Uuid::nil())]),
    );
    conn.register(QUERY, ResultSet::new(["token"]));

    let err = crud_api::run(&conn, QUERY, &(), &mut Session::default()).unwrap_err();
    assert!(matches!(err, CrudError::NoRows { record: "Session" }));
}
