//! Shared fixture schema for unit tests: users, their todos and addresses.

use criteria_proto::{Record, Value};

use crate::catalog::{Catalog, EntityDef, FieldDef, FieldType, RelationDef, ScalarType, SchemaBundle};
use crate::entity::Entity;
use crate::error::Error;
use crate::provider::MemoryProvider;
use crate::query::{get_field, Attr, Rel};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub login: Option<String>,
    pub roles: Vec<String>,
    pub address_id: Option<i64>,
    pub current_todo_id: Option<i64>,
}

impl User {
    pub const ID: Attr<User, i64> = Attr::new("id");
    pub const EMAIL: Attr<User, String> = Attr::new("email");
    pub const LOGIN: Attr<User, Option<String>> = Attr::new("login");
    pub const ROLES: Attr<User, Vec<String>> = Attr::new("roles");
    pub const CURRENT_TODO_ID: Attr<User, Option<i64>> = Attr::new("current_todo_id");
    pub const ADDRESS: Rel<User, Address> = Rel::new("address");
    pub const CURRENT_TODO: Rel<User, Todo> = Rel::new("current_todo");
    pub const TODOS: Rel<User, Vec<Todo>> = Rel::new("todos");
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            email: get_field(record, "email")?,
            login: get_field(record, "login")?,
            roles: get_field::<Option<Vec<String>>>(record, "roles")?.unwrap_or_default(),
            address_id: get_field(record, "address_id")?,
            current_todo_id: get_field(record, "current_todo_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub id: i64,
    pub name: String,
    pub importance: i32,
    pub user_id: Option<i64>,
}

impl Todo {
    pub const ID: Attr<Todo, i64> = Attr::new("id");
    pub const NAME: Attr<Todo, String> = Attr::new("name");
    pub const IMPORTANCE: Attr<Todo, i32> = Attr::new("importance");
    pub const USER_ID: Attr<Todo, Option<i64>> = Attr::new("user_id");
}

impl Entity for Todo {
    const NAME: &'static str = "Todo";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            name: get_field(record, "name")?,
            importance: get_field(record, "importance")?,
            user_id: get_field(record, "user_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: i64,
    pub city: String,
    pub country: String,
}

impl Address {
    pub const CITY: Attr<Address, String> = Attr::new("city");
    pub const COUNTRY: Attr<Address, String> = Attr::new("country");
}

impl Entity for Address {
    const NAME: &'static str = "Address";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            city: get_field(record, "city")?,
            country: get_field(record, "country")?,
        })
    }
}

pub fn catalog() -> Catalog {
    let int64 = || FieldType::scalar(ScalarType::Int64);
    let string = || FieldType::scalar(ScalarType::String);

    let user = EntityDef::new("User", "id").with_fields([
        FieldDef::new("id", int64()),
        FieldDef::new("email", string()),
        FieldDef::optional("login", string()),
        FieldDef::new("roles", FieldType::array_scalar(ScalarType::String)),
        FieldDef::optional("address_id", int64()),
        FieldDef::optional("current_todo_id", int64()),
    ]);
    let todo = EntityDef::new("Todo", "id").with_fields([
        FieldDef::new("id", int64()),
        FieldDef::new("name", string()),
        FieldDef::new("importance", FieldType::scalar(ScalarType::Int32)),
        FieldDef::optional("user_id", int64()),
    ]);
    let address = EntityDef::new("Address", "id").with_fields([
        FieldDef::new("id", int64()),
        FieldDef::new("city", string()),
        FieldDef::new("country", string()),
    ]);

    let schema = SchemaBundle::new(1)
        .with_entity(user)
        .with_entity(todo)
        .with_entity(address)
        .with_relation(RelationDef::many_to_one(
            "address",
            "User",
            "address_id",
            "Address",
            "id",
        ))
        .with_relation(RelationDef::many_to_one(
            "current_todo",
            "User",
            "current_todo_id",
            "Todo",
            "id",
        ))
        .with_relation(RelationDef::one_to_many(
            "todos", "User", "id", "Todo", "user_id",
        ));

    match Catalog::new(schema) {
        Ok(catalog) => catalog,
        Err(e) => panic!("fixture schema is invalid: {e}"),
    }
}

pub fn user(id: i64, email: &str, login: Option<&str>, roles: &[&str]) -> Record {
    Record::new("User")
        .with_field("id", id)
        .with_field("email", email)
        .with_field("login", login.map_or(Value::Null, Value::from))
        .with_field(
            "roles",
            roles.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        )
        .with_field("address_id", Value::Null)
        .with_field("current_todo_id", Value::Null)
}

pub fn todo(id: i64, name: &str, importance: i32, user_id: Option<i64>) -> Record {
    Record::new("Todo")
        .with_field("id", id)
        .with_field("name", name)
        .with_field("importance", importance)
        .with_field("user_id", user_id.map_or(Value::Null, Value::from))
}

/// Three users, four todos and two addresses.
///
/// | user | login | roles | address | current todo |
/// |------|-------|-------|---------|--------------|
/// | 1 email1 | ccc | ADMIN | Berlin | 1 |
/// | 2 email2 | aaa | USER | Paris | - |
/// | 3 email3 | - | - | - | 4 |
///
/// Todo importances are 5, 15, 20 (users 1, 1, 2) and 1 (user 3).
pub fn provider() -> MemoryProvider {
    let provider = MemoryProvider::for_catalog(&catalog());
    provider.insert_all([
        user(1, "email1", Some("ccc"), &["ADMIN"])
            .with_field("address_id", 1i64)
            .with_field("current_todo_id", 1i64),
        user(2, "email2", Some("aaa"), &["USER"]).with_field("address_id", 2i64),
        user(3, "email3", None, &[]).with_field("current_todo_id", 4i64),
        todo(1, "task1", 5, Some(1)),
        todo(2, "task2", 15, Some(1)),
        todo(3, "task3", 20, Some(2)),
        todo(4, "task4", 1, Some(3)),
        Record::new("Address")
            .with_field("id", 1i64)
            .with_field("city", "Berlin")
            .with_field("country", "DE"),
        Record::new("Address")
            .with_field("id", 2i64)
            .with_field("city", "Paris")
            .with_field("country", "FR"),
    ]);
    provider
}
