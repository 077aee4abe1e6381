use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use defmt::info;

use rp_pico::hal;
use rp_pico::hal::pac;

use pac::interrupt;
use usb_device::class_prelude::*;
use usb_device::prelude::*;

use mic_capture::{BlockLink, LinkBusy, RingReader, StreamState};

const USB_CLASS_VENDOR: u8 = 0xff;
const MAX_PACKET_SIZE: u16 = config::CHUNK_SIZE as u16;

/// Vendor interface: bulk IN carries block chunks, bulk OUT takes 2 byte commands.
pub struct MicClass<'a, B: UsbBus> {
    interface: InterfaceNumber,
    ep_data: EndpointIn<'a, B>,
    ep_cmd: EndpointOut<'a, B>,
    stream: StreamState,
    ring: RingReader<'a>,
}

struct DataEndpoint<'e, 'a, B: UsbBus>(&'e EndpointIn<'a, B>);

impl<B: UsbBus> BlockLink for DataEndpoint<'_, '_, B> {
    fn begin_transfer(&mut self, chunk: &[u8]) -> Result<(), LinkBusy> {
        // Chunks never exceed the packet size, so anything but WouldBlock is not expected
        // either. Retrying on the next completion is the only sensible reaction to both.
        self.0.write(chunk).map(|_| ()).map_err(|_| LinkBusy)
    }
}

impl<'a, B: UsbBus> MicClass<'a, B> {
    pub fn new(alloc: &'a UsbBusAllocator<B>, ring: RingReader<'a>) -> Self {
        Self {
            interface: alloc.interface(),
            ep_data: alloc.bulk(MAX_PACKET_SIZE),
            ep_cmd: alloc.bulk(MAX_PACKET_SIZE),
            stream: StreamState::new(),
            ring,
        }
    }

    /// Start sending a freshly published block if the host left us credit.
    pub fn poll_stream(&mut self) {
        self.stream
            .poll(&mut self.ring, &mut DataEndpoint(&self.ep_data));
    }
}

impl<B: UsbBus> UsbClass<B> for MicClass<'_, B> {
    fn get_configuration_descriptors(
        &self,
        writer: &mut DescriptorWriter,
    ) -> usb_device::Result<()> {
        writer.interface(self.interface, USB_CLASS_VENDOR, 0, 0)?;
        writer.endpoint(&self.ep_data)?;
        writer.endpoint(&self.ep_cmd)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.stream.reset(&mut self.ring);
    }

    fn endpoint_out(&mut self, addr: EndpointAddress) {
        if addr != self.ep_cmd.address() {
            return;
        }
        // Reading re-arms the endpoint for the next command.
        let mut buf = [0u8; MAX_PACKET_SIZE as usize];
        if let Ok(len) = self.ep_cmd.read(&mut buf) {
            self.stream
                .on_command(&buf[..len], &mut self.ring, &mut DataEndpoint(&self.ep_data));
        }
    }

    fn endpoint_in_complete(&mut self, addr: EndpointAddress) {
        if addr != self.ep_data.address() {
            return;
        }
        self.stream
            .on_chunk_sent(&mut self.ring, &mut DataEndpoint(&self.ep_data));
    }
}

type Bus = hal::usb::UsbBus;

struct UsbIrqData {
    device: UsbDevice<'static, Bus>,
    class: MicClass<'static, Bus>,
    configured: bool,
}
static USB_IRQ_DATA: Mutex<RefCell<Option<UsbIrqData>>> = Mutex::new(RefCell::new(None));

pub fn setup_usb(
    regs: pac::USBCTRL_REGS,
    dpram: pac::USBCTRL_DPRAM,
    clock: hal::clocks::UsbClock,
    resets: &mut pac::RESETS,
    ring: RingReader<'static>,
) {
    let bus: &'static UsbBusAllocator<Bus> = cortex_m::singleton!(
        : UsbBusAllocator<Bus> = UsbBusAllocator::new(Bus::new(regs, dpram, clock, true, resets))
    )
    .unwrap();

    let class = MicClass::new(bus, ring);
    let device = UsbDeviceBuilder::new(bus, UsbVidPid(config::USB_VID, config::USB_PID))
        .manufacturer("micstream")
        .product("ADC sample stream")
        .serial_number("0001")
        .device_class(USB_CLASS_VENDOR)
        .max_packet_size_0(64)
        .build();

    cortex_m::interrupt::free(|cs| {
        USB_IRQ_DATA.borrow(cs).replace(Some(UsbIrqData {
            device,
            class,
            configured: false,
        }));
    });

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
    }
}

/// Let the interrupt look at the ring after a new block was published.
pub fn notify_block_published() {
    pac::NVIC::pend(pac::Interrupt::USBCTRL_IRQ);
}

#[interrupt]
fn USBCTRL_IRQ() {
    // The `#[interrupt]` attribute covertly converts this to `&'static mut Option<UsbIrqData>`
    static mut DATA: Option<UsbIrqData> = None;

    let data = if let Some(data) = DATA {
        data
    } else {
        cortex_m::interrupt::free(|cs| {
            *DATA = USB_IRQ_DATA.borrow(cs).take();
            DATA.as_mut().unwrap()
        })
    };

    data.device.poll(&mut [&mut data.class]);

    let configured = data.device.state() == UsbDeviceState::Configured;
    if configured != data.configured {
        info!("usb configured: {}", configured);
        data.configured = configured;
    }
    if configured {
        data.class.poll_stream();
    }
}
