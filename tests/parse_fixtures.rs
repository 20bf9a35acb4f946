use std::sync::Arc;

use rosparse::types::WarningCode;
use rosparse::{
    CommandType, ErrorCode, Normalizer, OutputFormat, ParseHints, ParserConfig, ParserService,
    TypeConverter, Value,
};

const IP_ADDRESS_PRINT: &str = include_str!("fixtures/ip_address_print.txt");
const WIREGUARD_PRINT: &str = include_str!("fixtures/wireguard_print.txt");
const WIREGUARD_TERSE: &str = include_str!("fixtures/wireguard_print_terse.txt");
const PEERS_DETAIL: &str = include_str!("fixtures/wireguard_peers_detail.txt");
const EXPORT: &str = include_str!("fixtures/wireguard_export.txt");
const SYSTEM_RESOURCE: &str = include_str!("fixtures/system_resource.txt");

fn service() -> ParserService {
    ParserService::new(ParserConfig::default(), Arc::new(Normalizer::with_defaults()))
}

#[tokio::test]
async fn table_fixture_maps_columns_and_flags() {
    let hints = ParseHints::new(CommandType::Print, "/ip/address");
    let result = service()
        .parse_response(IP_ADDRESS_PRINT, &hints)
        .await
        .expect("parse table fixture");

    assert_eq!(result.metadata.format, OutputFormat::Table);
    assert_eq!(result.metadata.strategy_used, "table");
    assert_eq!(result.resources.len(), 3);
    assert!(result.warnings.is_empty());

    let first = &result.resources[0];
    assert_eq!(first.get("id"), Some(&Value::from("*0")));
    assert_eq!(first.get("address"), Some(&Value::from("192.168.88.1/24")));
    assert_eq!(first.get("network"), Some(&Value::from("192.168.88.0")));
    assert_eq!(first.get("interface"), Some(&Value::from("bridge")));
    assert!(!first.contains_key("dynamic"));

    let dynamic = &result.resources[1];
    assert_eq!(dynamic.get("dynamic"), Some(&Value::Bool(true)));
    assert_eq!(dynamic.get("interface"), Some(&Value::from("ether1")));

    let disabled = &result.resources[2];
    assert_eq!(disabled.get("disabled"), Some(&Value::Bool(true)));
    assert_eq!(disabled.get("address"), Some(&Value::from("172.16.0.1/30")));
    assert_eq!(disabled.get("interface"), Some(&Value::from("wg-office")));
}

#[tokio::test]
async fn ros7_table_with_columns_legend() {
    let hints = ParseHints::new(CommandType::Print, "/interface/wireguard");
    let result = service()
        .parse_response(WIREGUARD_PRINT, &hints)
        .await
        .expect("parse wireguard table");

    assert_eq!(result.metadata.strategy_used, "table");
    assert_eq!(result.resources.len(), 2);

    let office = &result.resources[0];
    assert_eq!(office.get("name"), Some(&Value::from("wg-office")));
    assert_eq!(office.get("listenPort"), Some(&Value::from("51820")));
    assert_eq!(office.get("mtu"), Some(&Value::from("1420")));
    assert_eq!(
        office.get("publicKey"),
        Some(&Value::from("YWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXo0NTY3ODk="))
    );
    // the R flag overrides the RUNNING column
    assert_eq!(office.get("running"), Some(&Value::Bool(true)));

    let lab = &result.resources[1];
    assert_eq!(lab.get("disabled"), Some(&Value::Bool(true)));
    assert_eq!(lab.get("running"), Some(&Value::from("false")));
    assert_eq!(lab.get("mtu"), Some(&Value::from("1280")));
}

#[tokio::test]
async fn terse_fixture_one_resource_per_line() {
    let hints = ParseHints::new(CommandType::PrintTerse, "/interface/wireguard");
    let result = service()
        .parse_response(WIREGUARD_TERSE, &hints)
        .await
        .expect("parse terse fixture");

    assert_eq!(result.metadata.strategy_used, "terse");
    assert_eq!(result.metadata.row_count, 2);

    let office = &result.resources[0];
    assert_eq!(office.get("id"), Some(&Value::from("*1")));
    assert_eq!(office.get("listenPort"), Some(&Value::from("51820")));
    assert_eq!(
        office.get("publicKey"),
        Some(&Value::from("YWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXo0NTY3ODk="))
    );

    let road = &result.resources[1];
    assert_eq!(road.get("name"), Some(&Value::from("wg road warrior")));
    assert_eq!(road.get("disabled"), Some(&Value::from("true")));
}

#[tokio::test]
async fn detail_fixture_merges_continuations_and_comments() {
    let hints = ParseHints::new(CommandType::PrintDetail, "/interface/wireguard/peers");
    let result = service()
        .parse_response(PEERS_DETAIL, &hints)
        .await
        .expect("parse detail fixture");

    assert_eq!(result.metadata.format, OutputFormat::Detail);
    assert_eq!(result.metadata.strategy_used, "detail");
    assert_eq!(result.resources.len(), 2);
    assert!(result.partial_data.is_none());

    let office = &result.resources[0];
    assert_eq!(office.get("id"), Some(&Value::from("*0")));
    assert_eq!(office.get("interface"), Some(&Value::from("wg-office")));
    assert_eq!(office.get("endpointAddress"), Some(&Value::from("203.0.113.10")));
    assert_eq!(
        office.get("allowedAddress"),
        Some(&Value::from("10.10.0.2/32,192.168.50.0/24"))
    );
    assert_eq!(office.get("persistentKeepalive"), Some(&Value::from("25s")));
    assert_eq!(office.get("lastHandshake"), Some(&Value::from("1m12s")));

    let laptop = &result.resources[1];
    assert_eq!(laptop.get("id"), Some(&Value::from("*1")));
    assert_eq!(laptop.get("comment"), Some(&Value::from("laptop")));
    assert_eq!(laptop.get("disabled"), Some(&Value::Bool(true)));
    assert_eq!(laptop.get("allowedAddress"), Some(&Value::from("10.10.0.3/32")));
}

#[tokio::test]
async fn export_fixture_joins_wrapped_lines() {
    let hints = ParseHints::new(CommandType::Export, "/");
    let result = service()
        .parse_response(EXPORT, &hints)
        .await
        .expect("parse export fixture");

    assert_eq!(result.metadata.strategy_used, "export");
    assert_eq!(result.metadata.router_os_version, "7.13.2");
    assert_eq!(result.resources.len(), 7);
    assert!(result.warnings.is_empty());

    let peer = result
        .resources
        .iter()
        .find(|r| r.get("_path") == Some(&Value::from("/interface wireguard peers")))
        .expect("peer command");
    assert_eq!(peer.get("_action"), Some(&Value::from("add")));
    assert_eq!(peer.get("endpointAddress"), Some(&Value::from("203.0.113.10")));
    assert_eq!(peer.get("comment"), Some(&Value::from("office peer")));
    assert_eq!(
        peer.get("publicKey"),
        Some(&Value::from("cGVlci1vbmUta2V5LXBsYWNlaG9sZGVyLWJhc2U2NA=="))
    );

    let address = result
        .resources
        .iter()
        .find(|r| r.get("_path") == Some(&Value::from("/ip address")))
        .expect("address command");
    assert_eq!(address.get("network"), Some(&Value::from("192.168.88.0")));

    let stateful = result
        .resources
        .iter()
        .find(|r| r.get("_comment").is_some())
        .expect("inline comment");
    assert_eq!(stateful.get("_comment"), Some(&Value::from("stateful")));
    assert_eq!(
        stateful.get("connectionState"),
        Some(&Value::from("established,related"))
    );

    let identity = result.resources.last().expect("identity command");
    assert_eq!(identity.get("_action"), Some(&Value::from("set")));
    assert_eq!(identity.get("name"), Some(&Value::from("core-router-01")));
}

#[tokio::test]
async fn keyvalue_fixture_converts_to_typed_values() {
    let normalizer = Arc::new(Normalizer::with_defaults());
    let service = ParserService::new(ParserConfig::default(), normalizer.clone());
    let hints = ParseHints::new(CommandType::SystemResource, "/system/resource");
    let mut result = service
        .parse_response(SYSTEM_RESOURCE, &hints)
        .await
        .expect("parse system resource");

    assert_eq!(result.metadata.strategy_used, "keyvalue");
    assert_eq!(result.metadata.router_os_version, "7.13.2");
    assert_eq!(result.resources.len(), 1);

    let converter = TypeConverter::new(normalizer);
    let resource = &mut result.resources[0];
    assert_eq!(resource.get("boardName"), Some(&Value::from("RB4011iGS+")));
    converter.convert_resource(resource);

    assert_eq!(resource.get("uptime"), Some(&Value::Int64(2_001_906)));
    assert_eq!(resource.get("cpuLoad"), Some(&Value::Int64(3)));
    assert_eq!(resource.get("freeMemory"), Some(&Value::Int64(851_968_000)));
    assert_eq!(resource.get("totalMemory"), Some(&Value::Int64(1_073_741_824)));
}

#[tokio::test]
async fn cached_strategy_is_reused_per_path() {
    let service = service();
    let hints = ParseHints::new(CommandType::Print, "/ip/address");
    service
        .parse_response(IP_ADDRESS_PRINT, &hints)
        .await
        .expect("first parse");
    assert_eq!(service.cached_strategy(&hints).await.as_deref(), Some("table"));

    let again = service
        .parse_response(IP_ADDRESS_PRINT, &hints)
        .await
        .expect("cached parse");
    assert_eq!(again.resources.len(), 3);
}

#[tokio::test]
async fn truncated_output_keeps_partial_results() {
    let mut raw = WIREGUARD_TERSE.to_string();
    raw.push_str("garbage without pairs\n");
    let result = service()
        .parse_response(&raw, &ParseHints::for_command(CommandType::PrintTerse))
        .await
        .expect("partial parse");

    assert_eq!(result.resources.len(), 2);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].code, WarningCode::MalformedLine);
    let partial = result.partial_data.expect("partial data");
    assert_eq!(partial.parsed_count, 2);
    assert_eq!(partial.failed_count, 1);
    assert_eq!(partial.unparseable_lines, vec!["garbage without pairs".to_string()]);
}

#[tokio::test]
async fn unrecognized_output_reports_no_parser() {
    let err = service()
        .parse_response("interrupted\n", &ParseHints::default())
        .await
        .expect_err("nothing applies");
    assert_eq!(err.code, ErrorCode::NoMatchingParser);
    assert!(err.raw_snippet.is_some());
}
