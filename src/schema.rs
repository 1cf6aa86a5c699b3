// Diesel declarations matching the DDL exposed by each service's `SCHEMA` constant.

diesel::table! {
    tickets (guild_id, id) {
        id -> Int4,
        guild_id -> Int8,
        channel_id -> Nullable<Int8>,
        user_id -> Int8,
        open -> Bool,
        open_time -> Timestamptz,
        welcome_message_id -> Nullable<Int8>,
        panel_id -> Nullable<Int4>,
        close_time -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    ticket_members (guild_id, ticket_id, user_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        user_id -> Int8,
    }
}

diesel::table! {
    ticket_claims (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        user_id -> Int8,
    }
}

diesel::table! {
    ticket_last_message (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        last_message_id -> Nullable<Int8>,
        last_message_time -> Nullable<Timestamptz>,
        user_id -> Nullable<Int8>,
        user_is_staff -> Bool,
    }
}

diesel::table! {
    close_reason (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        #[sql_name = "close_reason"]
        reason -> Nullable<Text>,
        closed_by -> Nullable<Int8>,
    }
}

diesel::table! {
    close_request (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        user_id -> Int8,
        message_id -> Nullable<Int8>,
        close_at -> Nullable<Timestamptz>,
        close_reason -> Nullable<Text>,
    }
}

diesel::table! {
    auto_close (guild_id) {
        guild_id -> Int8,
        enabled -> Bool,
        since_open_with_no_response -> Nullable<Interval>,
        since_last_message -> Nullable<Interval>,
        on_user_leave -> Nullable<Bool>,
    }
}

diesel::table! {
    auto_close_exclude (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
    }
}

diesel::table! {
    service_ratings (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        rating -> Int2,
    }
}

diesel::table! {
    webhooks (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        webhook_id -> Int8,
        webhook_token -> Text,
    }
}

diesel::table! {
    archive_messages (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        channel_id -> Int8,
        message_id -> Int8,
    }
}

diesel::table! {
    exit_survey_responses (guild_id, ticket_id, question_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        form_id -> Int4,
        question_id -> Int4,
        response -> Nullable<Text>,
    }
}

diesel::table! {
    first_response_time (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        user_id -> Int8,
        response_time -> Interval,
    }
}

diesel::table! {
    category_update_queue (guild_id, ticket_id) {
        guild_id -> Int8,
        ticket_id -> Int4,
        new_status -> Text,
        status_changed_at -> Timestamptz,
    }
}

diesel::table! {
    embeds (id) {
        id -> Int4,
        guild_id -> Int8,
        title -> Nullable<Text>,
        description -> Nullable<Text>,
        url -> Nullable<Text>,
        colour -> Int4,
        author_name -> Nullable<Text>,
        author_icon_url -> Nullable<Text>,
        author_url -> Nullable<Text>,
        image_url -> Nullable<Text>,
        thumbnail_url -> Nullable<Text>,
        footer_text -> Nullable<Text>,
        footer_icon_url -> Nullable<Text>,
        timestamp -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    embed_fields (id) {
        id -> Int4,
        embed_id -> Int4,
        name -> Text,
        value -> Text,
        inline -> Bool,
    }
}

diesel::table! {
    forms (form_id) {
        form_id -> Int4,
        guild_id -> Int8,
        title -> Text,
        custom_id -> Text,
    }
}

diesel::table! {
    form_input (id) {
        id -> Int4,
        form_id -> Int4,
        position -> Int4,
        custom_id -> Text,
        style -> Int2,
        label -> Text,
        placeholder -> Nullable<Text>,
        required -> Bool,
        min_length -> Nullable<Int2>,
        max_length -> Nullable<Int2>,
    }
}

diesel::table! {
    panels (panel_id) {
        panel_id -> Int4,
        message_id -> Int8,
        channel_id -> Int8,
        guild_id -> Int8,
        title -> Text,
        content -> Text,
        colour -> Int4,
        target_category -> Int8,
        emoji_name -> Nullable<Text>,
        emoji_id -> Nullable<Int8>,
        welcome_message_embed -> Nullable<Int4>,
        with_default_team -> Bool,
        custom_id -> Text,
        image_url -> Nullable<Text>,
        thumbnail_url -> Nullable<Text>,
        button_style -> Int2,
        button_label -> Nullable<Text>,
        form_id -> Nullable<Int4>,
    }
}

diesel::table! {
    panel_user_mention (panel_id) {
        panel_id -> Int4,
        should_mention_user -> Bool,
    }
}

diesel::table! {
    panel_role_mentions (panel_id, role_id) {
        panel_id -> Int4,
        role_id -> Int8,
    }
}

diesel::table! {
    panel_teams (panel_id, team_id) {
        panel_id -> Int4,
        team_id -> Int4,
    }
}

diesel::table! {
    panel_access_control_rules (panel_id, role_id) {
        panel_id -> Int4,
        role_id -> Int8,
        position -> Int4,
        action -> Text,
    }
}

diesel::table! {
    multi_panels (id) {
        id -> Int4,
        message_id -> Int8,
        channel_id -> Int8,
        guild_id -> Int8,
        title -> Text,
        content -> Text,
        colour -> Int4,
        select_menu -> Bool,
        embed_id -> Nullable<Int4>,
    }
}

diesel::table! {
    multi_panel_targets (multi_panel_id, panel_id) {
        multi_panel_id -> Int4,
        panel_id -> Int4,
    }
}

diesel::table! {
    support_team (id) {
        id -> Int4,
        guild_id -> Int8,
        name -> Text,
    }
}

diesel::table! {
    support_team_members (team_id, user_id) {
        team_id -> Int4,
        user_id -> Int8,
    }
}

diesel::table! {
    support_team_roles (team_id, role_id) {
        team_id -> Int4,
        role_id -> Int8,
    }
}

diesel::table! {
    permissions (guild_id, user_id) {
        guild_id -> Int8,
        user_id -> Int8,
        support -> Bool,
        admin -> Bool,
    }
}

diesel::table! {
    role_permissions (guild_id, role_id) {
        guild_id -> Int8,
        role_id -> Int8,
        support -> Bool,
        admin -> Bool,
    }
}

diesel::table! {
    custom_integrations (id) {
        id -> Int4,
        owner_id -> Int8,
        webhook_url -> Text,
        validation_url -> Nullable<Text>,
        http_method -> Text,
        name -> Text,
        description -> Text,
        image_url -> Nullable<Text>,
        privacy_policy_url -> Nullable<Text>,
        public -> Bool,
        approved -> Bool,
    }
}

diesel::table! {
    custom_integration_headers (id) {
        id -> Int4,
        integration_id -> Int4,
        name -> Text,
        value -> Text,
    }
}

diesel::table! {
    custom_integration_secrets (id) {
        id -> Int4,
        integration_id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    custom_integration_secret_values (secret_id, guild_id) {
        secret_id -> Int4,
        integration_id -> Int4,
        guild_id -> Int8,
        value -> Text,
    }
}

diesel::table! {
    custom_integration_placeholders (id) {
        id -> Int4,
        integration_id -> Int4,
        name -> Text,
        json_path -> Text,
    }
}

diesel::table! {
    custom_integration_guilds (integration_id, guild_id) {
        integration_id -> Int4,
        guild_id -> Int8,
    }
}

diesel::table! {
    skus (id) {
        id -> Uuid,
        label -> Text,
        sku_type -> Text,
    }
}

diesel::table! {
    subscription_skus (sku_id) {
        sku_id -> Uuid,
        tier -> Text,
        priority -> Int4,
        is_global -> Bool,
    }
}

diesel::table! {
    multi_server_skus (sku_id) {
        sku_id -> Uuid,
        servers_permitted -> Int4,
    }
}

diesel::table! {
    discord_store_skus (discord_id) {
        discord_id -> Int8,
        sku_id -> Uuid,
    }
}

diesel::table! {
    entitlements (id) {
        id -> Uuid,
        guild_id -> Nullable<Int8>,
        user_id -> Nullable<Int8>,
        sku_id -> Uuid,
        source -> Text,
        expires_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    multi_server_entitlement_guilds (entitlement_id, guild_id) {
        entitlement_id -> Uuid,
        guild_id -> Int8,
        assigned_at -> Timestamptz,
    }
}

diesel::table! {
    legacy_premium_entitlements (user_id) {
        user_id -> Int8,
        tier -> Text,
        sku_label -> Text,
        sku_id -> Uuid,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    patreon_entitlements (entitlement_id) {
        entitlement_id -> Uuid,
        user_id -> Int8,
    }
}

diesel::table! {
    discord_entitlements (discord_id) {
        discord_id -> Int8,
        entitlement_id -> Uuid,
    }
}

diesel::table! {
    users_can_close (guild_id) {
        guild_id -> Int8,
        #[sql_name = "users_can_close"]
        can_close -> Bool,
    }
}

diesel::table! {
    custom_colours (guild_id, colour_id) {
        guild_id -> Int8,
        colour_id -> Int2,
        colour -> Int4,
    }
}

diesel::table! {
    votes (user_id) {
        user_id -> Int8,
        vote_time -> Timestamptz,
    }
}

diesel::table! {
    premium_keys (key) {
        key -> Uuid,
        length -> Interval,
        sku_id -> Uuid,
        generated_at -> Timestamptz,
    }
}

diesel::table! {
    used_keys (key) {
        key -> Uuid,
        guild_id -> Int8,
        activated_by -> Int8,
        activated_at -> Timestamptz,
    }
}

diesel::table! {
    user_guilds (user_id, guild_id) {
        user_id -> Int8,
        guild_id -> Int8,
        is_owner -> Bool,
        permissions -> Int8,
    }
}

diesel::table! {
    modmail_archive (uuid) {
        uuid -> Uuid,
        guild_id -> Int8,
        user_id -> Int8,
        close_time -> Timestamptz,
    }
}

diesel::table! {
    whitelabel (user_id) {
        user_id -> Int8,
        bot_id -> Int8,
        token -> Text,
        public_key -> Text,
    }
}

diesel::table! {
    whitelabel_guilds (bot_id, guild_id) {
        bot_id -> Int8,
        guild_id -> Int8,
    }
}

diesel::table! {
    whitelabel_errors (id) {
        id -> Int4,
        user_id -> Int8,
        error -> Text,
        error_time -> Timestamptz,
    }
}

diesel::joinable!(embed_fields -> embeds (embed_id));
diesel::joinable!(form_input -> forms (form_id));
diesel::joinable!(panel_teams -> panels (panel_id));
diesel::joinable!(panel_teams -> support_team (team_id));
diesel::joinable!(panel_role_mentions -> panels (panel_id));
diesel::joinable!(panel_access_control_rules -> panels (panel_id));
diesel::joinable!(multi_panel_targets -> multi_panels (multi_panel_id));
diesel::joinable!(multi_panel_targets -> panels (panel_id));
diesel::joinable!(support_team_members -> support_team (team_id));
diesel::joinable!(support_team_roles -> support_team (team_id));
diesel::joinable!(custom_integration_headers -> custom_integrations (integration_id));
diesel::joinable!(custom_integration_secrets -> custom_integrations (integration_id));
diesel::joinable!(custom_integration_secret_values -> custom_integration_secrets (secret_id));
diesel::joinable!(custom_integration_placeholders -> custom_integrations (integration_id));
diesel::joinable!(custom_integration_guilds -> custom_integrations (integration_id));
diesel::joinable!(subscription_skus -> skus (sku_id));
diesel::joinable!(multi_server_skus -> skus (sku_id));
diesel::joinable!(entitlements -> skus (sku_id));
diesel::joinable!(whitelabel_errors -> whitelabel (user_id));
diesel::joinable!(discord_store_skus -> skus (sku_id));
diesel::joinable!(multi_server_entitlement_guilds -> entitlements (entitlement_id));
diesel::joinable!(patreon_entitlements -> entitlements (entitlement_id));
diesel::joinable!(discord_entitlements -> entitlements (entitlement_id));
diesel::joinable!(panel_user_mention -> panels (panel_id));

diesel::allow_tables_to_appear_in_same_query!(
    tickets,
    ticket_members,
    ticket_claims,
    ticket_last_message,
    close_reason,
    close_request,
    auto_close,
    auto_close_exclude,
    service_ratings,
    webhooks,
    archive_messages,
    exit_survey_responses,
    first_response_time,
    category_update_queue,
    embeds,
    embed_fields,
    forms,
    form_input,
    panels,
    panel_user_mention,
    panel_role_mentions,
    panel_teams,
    panel_access_control_rules,
    multi_panels,
    multi_panel_targets,
    support_team,
    support_team_members,
    support_team_roles,
    permissions,
    role_permissions,
    custom_integrations,
    custom_integration_headers,
    custom_integration_secrets,
    custom_integration_secret_values,
    custom_integration_placeholders,
    custom_integration_guilds,
    skus,
    subscription_skus,
    multi_server_skus,
    discord_store_skus,
    entitlements,
    multi_server_entitlement_guilds,
    legacy_premium_entitlements,
    patreon_entitlements,
    discord_entitlements,
    users_can_close,
    custom_colours,
    votes,
    premium_keys,
    used_keys,
    user_guilds,
    modmail_archive,
    whitelabel,
    whitelabel_guilds,
    whitelabel_errors,
);
