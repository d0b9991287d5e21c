//! Bluedroid GATT server for the BLE-MIDI service.
//!
//! Registers one primary service with the MIDI I/O characteristic and its
//! CCCD, advertises the service UUID under the device name, and bridges the
//! C callbacks to the [`BleMidiLink`] handed to [`start`]:
//!
//! | GATTS event  | Action                                         |
//! |--------------|------------------------------------------------|
//! | CONNECT      | `set_connected(true)`, remember `conn_id`      |
//! | DISCONNECT   | `set_connected(false)`, advertise again        |
//! | WRITE (I/O)  | `on_packet(data)`                              |
//! | READ (I/O)   | empty response (BLE-MIDI read returns nothing) |
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: raw `esp_idf_svc::sys` Bluedroid calls.
//! - **all other targets**: [`start`] only records the link; [`notify`]
//!   reports failure so callers drop the packet.

use std::sync::{Arc, OnceLock};

use log::info;

use super::ble_midi::{BleMidiLink, MIDI_SERVICE_UUID};
use crate::error::Result;

/// Link the callbacks feed. Set once by [`start`].
static LINK: OnceLock<Arc<BleMidiLink>> = OnceLock::new();

fn link() -> Option<&'static Arc<BleMidiLink>> {
    LINK.get()
}

// ── ESP-IDF ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod bluedroid {
    use core::sync::atomic::{AtomicU32, Ordering};

    use esp_idf_svc::sys::*;

    use super::link;
    use crate::adapters::ble_midi::{MIDI_IO_CHAR_UUID, MIDI_SERVICE_UUID};

    /// Handles for service, characteristic and CCCD.
    const SERVICE_HANDLES: u16 = 8;
    const CCCD_UUID: u16 = 0x2902;

    pub(super) static GATTS_IF: AtomicU32 = AtomicU32::new(0);
    pub(super) static CONN_ID: AtomicU32 = AtomicU32::new(0);
    pub(super) static IO_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
    static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);

    /// Advertised service UUID, little-endian as the controller expects.
    static SERVICE_UUID_LE: [u8; 16] = MIDI_SERVICE_UUID.to_le_bytes();

    fn uuid128(uuid: u128) -> esp_bt_uuid_t {
        // SAFETY: plain C struct; the union member written matches `len`.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_128 as u16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    fn uuid16(uuid: u16) -> esp_bt_uuid_t {
        // SAFETY: as above.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_16 as u16;
        t.uuid.uuid16 = uuid;
        t
    }

    fn adv_params() -> esp_ble_adv_params_t {
        esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            // SAFETY: the remaining fields are plain integers/arrays.
            ..unsafe { core::mem::zeroed() }
        }
    }

    fn start_advertising() {
        let mut params = adv_params();
        // SAFETY: Bluedroid copies the parameters before returning.
        unsafe {
            esp_ble_gap_start_advertising(&mut params);
        }
    }

    fn check(ret: esp_err_t, what: &str) -> Result<(), i32> {
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            log::error!("ble: {} failed ({})", what, ret);
            Err(ret)
        }
    }

    /// Controller, Bluedroid, callbacks, app registration and advertising
    /// data. Advertising itself starts once the data is set.
    pub(super) fn init(device_name: &str) -> Result<(), i32> {
        let mut name = heapless::Vec::<u8, 32>::new();
        for &b in device_name.as_bytes().iter().take(31) {
            let _ = name.push(b);
        }
        let _ = name.push(0);

        // SAFETY: one-time stack bring-up from the main task; every pointer
        // passed below outlives the call or is copied by Bluedroid.
        unsafe {
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            check(esp_bt_controller_init(&mut bt_cfg), "bt_controller_init")?;
            check(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE), "bt_controller_enable")?;
            check(esp_bluedroid_init(), "bluedroid_init")?;
            check(esp_bluedroid_enable(), "bluedroid_enable")?;

            check(esp_ble_gap_register_callback(Some(gap_event_handler)), "gap_register_callback")?;
            check(esp_ble_gatts_register_callback(Some(gatts_event_handler)), "gatts_register_callback")?;
            check(esp_ble_gatts_app_register(0), "gatts_app_register")?;

            check(esp_ble_gap_set_device_name(name.as_ptr().cast()), "gap_set_device_name")?;

            let mut adv_data: esp_ble_adv_data_t = core::mem::zeroed();
            adv_data.include_name = true;
            adv_data.flag = (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8;
            adv_data.service_uuid_len = SERVICE_UUID_LE.len() as u16;
            adv_data.p_service_uuid = SERVICE_UUID_LE.as_ptr().cast_mut();
            check(esp_ble_gap_config_adv_data(&mut adv_data), "gap_config_adv_data")?;
        }
        Ok(())
    }

    pub(super) fn notify(packet: &[u8]) -> bool {
        let handle = IO_CHAR_HANDLE.load(Ordering::Relaxed);
        if handle == 0 {
            return false;
        }
        let mut data = heapless::Vec::<u8, 8>::new();
        if data.extend_from_slice(packet).is_err() {
            return false;
        }
        // SAFETY: `data` lives until the call returns; Bluedroid copies it.
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t,
                CONN_ID.load(Ordering::Relaxed) as u16,
                handle as u16,
                data.len() as u16,
                data.as_mut_ptr(),
                false,
            )
        };
        ret == ESP_OK as i32
    }

    unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => start_advertising(),
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                log::info!("ble: advertising BLE-MIDI");
            }
            _ => {}
        }
    }

    unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        GATTS_IF.store(u32::from(gatts_if), Ordering::Relaxed);

        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128(MIDI_SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                // SAFETY: `svc_id` is copied by Bluedroid.
                unsafe {
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, SERVICE_HANDLES);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                // SAFETY: `param` is valid for this event; `create` is its member.
                let svc_handle = unsafe { (*param).create.service_handle };
                SVC_HANDLE.store(u32::from(svc_handle), Ordering::Relaxed);
                let mut char_uuid = uuid128(MIDI_IO_CHAR_UUID);
                // SAFETY: handles come from Bluedroid; values are responded by app.
                unsafe {
                    esp_ble_gatts_start_service(svc_handle);
                    esp_ble_gatts_add_char(
                        svc_handle,
                        &mut char_uuid,
                        (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                        (ESP_GATT_CHAR_PROP_BIT_READ
                            | ESP_GATT_CHAR_PROP_BIT_WRITE_NR
                            | ESP_GATT_CHAR_PROP_BIT_NOTIFY) as esp_gatt_char_prop_t,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                // SAFETY: `add_char` is the member for this event.
                let handle = unsafe { (*param).add_char.attr_handle };
                IO_CHAR_HANDLE.store(u32::from(handle), Ordering::Relaxed);
                let mut cccd = uuid16(CCCD_UUID);
                // SAFETY: as above.
                unsafe {
                    esp_ble_gatts_add_char_descr(
                        SVC_HANDLE.load(Ordering::Relaxed) as u16,
                        &mut cccd,
                        (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    );
                }
                log::info!("ble: MIDI I/O characteristic (handle={})", handle);
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                // SAFETY: `connect` is the member for this event.
                let conn_id = unsafe { (*param).connect.conn_id };
                CONN_ID.store(u32::from(conn_id), Ordering::Relaxed);
                if let Some(link) = link() {
                    link.set_connected(true);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                if let Some(link) = link() {
                    link.set_connected(false);
                }
                start_advertising();
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                // SAFETY: `write` is the member for this event and `value`
                // points at `len` bytes for the duration of the callback.
                let p = unsafe { &(*param).write };
                if u32::from(p.handle) == IO_CHAR_HANDLE.load(Ordering::Relaxed) && !p.is_prep {
                    let data = unsafe { core::slice::from_raw_parts(p.value, usize::from(p.len)) };
                    if let Some(link) = link() {
                        link.on_packet(data);
                    }
                }
                if p.need_rsp {
                    // SAFETY: answers the request this event carries.
                    unsafe {
                        esp_ble_gatts_send_response(
                            gatts_if,
                            p.conn_id,
                            p.trans_id,
                            esp_gatt_status_t_ESP_GATT_OK,
                            core::ptr::null_mut(),
                        );
                    }
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                // SAFETY: `read` is the member for this event.
                let p = unsafe { &(*param).read };
                let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
                // SAFETY: `attr_value` is the active member of the response.
                unsafe {
                    rsp.attr_value.handle = p.handle;
                    rsp.attr_value.len = 0;
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        &mut rsp,
                    );
                }
            }
            _ => {}
        }
    }
}

// ── Public API ───────────────────────────────────────────────

/// Bring the BLE stack up and serve `link` as the MIDI I/O characteristic.
/// Calling it twice keeps the first link.
pub fn start(device_name: &str, link: Arc<BleMidiLink>) -> Result<()> {
    if LINK.set(link).is_err() {
        log::warn!("ble: GATT server already started");
        return Ok(());
    }
    platform_start(device_name)
}

/// Notify one framed packet to the connected central.
pub fn notify(packet: &[u8]) -> bool {
    if !link().is_some_and(|l| l.is_connected()) {
        return false;
    }
    platform_notify(packet)
}

#[cfg(target_os = "espidf")]
fn platform_start(device_name: &str) -> Result<()> {
    bluedroid::init(device_name).map_err(crate::error::Error::Ble)?;
    info!("ble: GATT server up as '{}' (service {:032x})", device_name, MIDI_SERVICE_UUID);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn platform_start(device_name: &str) -> Result<()> {
    info!("ble(sim): '{}' (service {:032x}), no radio", device_name, MIDI_SERVICE_UUID);
    Ok(())
}

#[cfg(target_os = "espidf")]
fn platform_notify(packet: &[u8]) -> bool {
    bluedroid::notify(packet)
}

#[cfg(not(target_os = "espidf"))]
fn platform_notify(_packet: &[u8]) -> bool {
    false
}
