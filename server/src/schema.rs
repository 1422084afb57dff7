diesel::table! {
    users (id) {
        id -> Uuid,
        #[max_length = 254]
        email -> Varchar,
        #[max_length = 150]
        username -> Varchar,
        #[max_length = 150]
        first_name -> Varchar,
        #[max_length = 150]
        last_name -> Varchar,
        avatar -> Nullable<Text>,
        #[max_length = 255]
        password_hash -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    sessions (id) {
        id -> Uuid,
        user_id -> Uuid,
        #[max_length = 255]
        token_hash -> Varchar,
        expires_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tags (id) {
        id -> Uuid,
        #[max_length = 50]
        name -> Varchar,
        #[max_length = 7]
        color -> Varchar,
        #[max_length = 50]
        slug -> Varchar,
    }
}

diesel::table! {
    ingredients (id) {
        id -> Uuid,
        #[max_length = 128]
        name -> Varchar,
        #[max_length = 64]
        measurement_unit -> Varchar,
    }
}

diesel::table! {
    recipes (id) {
        id -> Uuid,
        author_id -> Uuid,
        #[max_length = 128]
        name -> Varchar,
        image -> Text,
        text -> Text,
        cooking_time -> Int4,
        pub_date -> Timestamptz,
    }
}

diesel::table! {
    recipe_ingredients (id) {
        id -> Uuid,
        recipe_id -> Uuid,
        ingredient_id -> Uuid,
        amount -> Int4,
    }
}

diesel::table! {
    recipe_tags (id) {
        id -> Uuid,
        recipe_id -> Uuid,
        tag_id -> Uuid,
    }
}

diesel::table! {
    favorites (id) {
        id -> Uuid,
        user_id -> Uuid,
        recipe_id -> Uuid,
    }
}

diesel::table! {
    cart_items (id) {
        id -> Uuid,
        user_id -> Uuid,
        recipe_id -> Uuid,
    }
}

diesel::table! {
    follows (id) {
        id -> Uuid,
        user_id -> Uuid,
        author_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(sessions -> users (user_id));
diesel::joinable!(recipes -> users (author_id));
diesel::joinable!(recipe_ingredients -> recipes (recipe_id));
diesel::joinable!(recipe_ingredients -> ingredients (ingredient_id));
diesel::joinable!(recipe_tags -> recipes (recipe_id));
diesel::joinable!(recipe_tags -> tags (tag_id));
diesel::joinable!(favorites -> users (user_id));
diesel::joinable!(favorites -> recipes (recipe_id));
diesel::joinable!(cart_items -> users (user_id));
diesel::joinable!(cart_items -> recipes (recipe_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    sessions,
    tags,
    ingredients,
    recipes,
    recipe_ingredients,
    recipe_tags,
    favorites,
    cart_items,
    follows,
);
