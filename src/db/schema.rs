diesel::table! {
    categories (id) {
        id -> Int4,
        name -> Varchar,
        slug -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    products (id) {
        id -> Int4,
        category_id -> Int4,
        created_by -> Int4,
        title -> Varchar,
        author -> Varchar,
        description -> Text,
        image -> Varchar,
        price -> Numeric,
        in_stock -> Bool,
        is_active -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        slug -> Varchar,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        password_hash -> Varchar,
        is_staff -> Bool,
    }
}

diesel::joinable!(products -> categories (category_id));
diesel::joinable!(products -> users (created_by));

diesel::allow_tables_to_appear_in_same_query!(categories, products, users);
