diesel::table! {
    history_v (history_id) {
        history_id -> Integer,
        serial -> Text,
        station -> Text,
        tested_at -> Nullable<Timestamp>,
        pass_flag -> Nullable<Text>,
        jig -> Nullable<Text>,
        test_week -> Text,
        year -> Nullable<Text>,
        model_name -> Text,
        model_suffix -> Text,
    }
}
