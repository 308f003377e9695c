use crate::model::NetCounters;
use std::fs;
use std::path::Path;

pub fn read_counters(proc_root: &Path) -> NetCounters {
    parse_net_dev(&fs::read_to_string(proc_root.join("net/dev")).unwrap_or_default())
}

/// Sum receive and transmit bytes over every interface except loopback.
pub fn parse_net_dev(netdev: &str) -> NetCounters {
    let mut total = NetCounters::default();

    for line in netdev.lines().skip(2) {
        // "eth0:123 ..." has no space after the colon on busy interfaces
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        if name.trim() == "lo" {
            continue;
        }
        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        let (Ok(rx), Ok(tx)) = (fields[0].parse::<u64>(), fields[8].parse::<u64>()) else {
            continue;
        };
        total.rx_bytes += rx;
        total.tx_bytes += tx;
    }

    total
}

/// Open TCP sockets over IPv4 and IPv6.
pub fn read_connection_count(proc_root: &Path) -> usize {
    ["net/tcp", "net/tcp6"]
        .iter()
        .map(|table| {
            fs::read_to_string(proc_root.join(table))
                .map(|s| count_table_rows(&s))
                .unwrap_or(0)
        })
        .sum()
}

fn count_table_rows(table: &str) -> usize {
    table.lines().skip(1).filter(|l| !l.trim().is_empty()).count()
}
