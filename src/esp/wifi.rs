use anyhow::Context;
use embedded_svc::wifi::{ClientConfiguration, Configuration, Wifi};
use esp_idf_hal::{modem::Modem, peripheral::Peripheral};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    netif::{EspNetif, EspNetifWait},
    nvs::EspDefaultNvsPartition,
    wifi::{EspWifi, WifiWait},
};
use std::{net::Ipv4Addr, time::Duration};

const WAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Joins the access point `ssid` and waits for a DHCP lease.
pub fn bringup(
    modem: impl Peripheral<P = Modem> + 'static,
    sysloop: &EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    ssid: &str,
    pass: &str,
) -> anyhow::Result<Box<EspWifi<'static>>> {
    log::info!("bringing up WiFi...");
    let mut wifi = Box::new(EspWifi::new(modem, sysloop.clone(), Some(nvs))?);

    let aps = Wifi::scan(&mut *wifi).context("scanning for access points")?;
    let channel = aps.iter().find(|ap| ap.ssid == ssid).map(|ap| ap.channel);
    match channel {
        Some(channel) => log::info!("found access point for {ssid} on channel {channel}"),
        None => log::warn!("could not find desired AP SSID {ssid} in scan results"),
    }

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid
            .parse()
            .map_err(|_| anyhow::anyhow!("ssid too long"))?,
        password: pass
            .parse()
            .map_err(|_| anyhow::anyhow!("password too long"))?,
        channel,
        ..Default::default()
    }))
    .context("failed to set WiFi configuration")?;

    wifi.start().context("failed to start WiFi")?;
    let started = WifiWait::new(sysloop)
        .context("failed to create wifi wait")?
        .wait_with_timeout(WAIT_TIMEOUT, || wifi.is_started().unwrap_or_default());
    anyhow::ensure!(started, "WiFi did not start within {WAIT_TIMEOUT:?}");

    wifi.connect().context("failed to connect to WiFi network")?;
    let connected = EspNetifWait::new::<EspNetif>(wifi.sta_netif(), sysloop)
        .context("failed to create wait for STA netif")?
        .wait_with_timeout(WAIT_TIMEOUT, || {
            wifi.is_connected().unwrap_or_default()
                && wifi
                    .sta_netif()
                    .get_ip_info()
                    .map(|info| info.ip != Ipv4Addr::UNSPECIFIED)
                    .unwrap_or_default()
        });
    anyhow::ensure!(
        connected,
        "WiFi did not recieve a DHCP lease within {WAIT_TIMEOUT:?}"
    );

    let ip_info = wifi.sta_netif().get_ip_info()?;
    log::info!("WiFi DHCP info: {ip_info:?}");

    Ok(wifi)
}
