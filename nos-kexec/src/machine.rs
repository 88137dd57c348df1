//! Transition orchestrator
//!
//! Drives a kexec from an armed image to the relocation routine:
//!
//! ```text
//! Armed -> ContextSaved* -> InterruptsDisabled -> LegacyApic* ->
//! DescriptionTableBuilt -> SegmentsFlattened -> DescriptorTablesInvalidated ->
//! Relocated -> Resumed*
//! ```
//!
//! Starred stages only exist for preserve-context images. Everything that
//! can fail is checked while arming; from `InterruptsDisabled` on nothing
//! blocks, allocates or returns an error.

use crate::config::KexecConfig;
use crate::context::{quiesce_interrupts, IrqQuiesce, SavedContext, TraceSwitch};
use crate::descriptor::{flatten_segments, invalidate_tables};
use crate::error::{KexecError, Result};
use crate::image::{ImageType, KexecImage};
use crate::page_list::PageList;
use crate::pgtable::{ArmedTables, ReservedTables, KEXEC_TABLES};
use crate::processor::Processor;
use crate::relocate::{RelocationArgs, RelocationEntry};

/// Transition stages in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Armed,
    ContextSaved,
    InterruptsDisabled,
    LegacyApic,
    DescriptionTableBuilt,
    SegmentsFlattened,
    /// Point of no return.
    DescriptorTablesInvalidated,
    Relocated,
    Resumed,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Armed => "armed",
            Stage::ContextSaved => "context saved",
            Stage::InterruptsDisabled => "interrupts disabled",
            Stage::LegacyApic => "legacy apic",
            Stage::DescriptionTableBuilt => "page list built",
            Stage::SegmentsFlattened => "segments flattened",
            Stage::DescriptorTablesInvalidated => "descriptor tables invalidated",
            Stage::Relocated => "relocated",
            Stage::Resumed => "resumed",
        }
    }

    /// Whether a logger may run while this stage is reported. Between
    /// invalidating the descriptor tables and resuming, any fault or
    /// contended lock inside the logger is fatal.
    pub fn may_log(&self) -> bool {
        !matches!(self, Stage::DescriptorTablesInvalidated | Stage::Relocated)
    }
}

/// Receives every stage as it is entered. Runs with interrupts masked for
/// most stages; must not block or allocate.
pub trait StageObserver {
    fn on_stage(&mut self, stage: Stage);
}

/// Proof that a preserve-context transition came back.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeToken {
    entry: usize,
}

impl ResumeToken {
    /// Entry address to re-enter the destination kernel through.
    pub fn entry(&self) -> usize {
        self.entry
    }
}

/// Owner of everything a transition needs, set up before any image is
/// committed.
pub struct KexecMachine<'a, P, R, T> {
    config: KexecConfig,
    cpu: P,
    relocator: R,
    trace: T,
    tables: &'a ReservedTables,
    quiesce: Option<&'a mut dyn IrqQuiesce>,
    observer: Option<&'a mut dyn StageObserver>,
}

impl<'a, P, R, T> KexecMachine<'a, P, R, T>
where
    P: Processor,
    R: RelocationEntry,
    T: TraceSwitch,
{
    /// Machine over the kernel-wide reserved tables.
    pub fn new(config: KexecConfig, cpu: P, relocator: R, trace: T) -> Self {
        Self {
            config,
            cpu,
            relocator,
            trace,
            tables: &KEXEC_TABLES,
            quiesce: None,
            observer: None,
        }
    }

    /// Use `tables` instead of the kernel-wide reservation.
    pub fn with_tables(mut self, tables: &'a ReservedTables) -> Self {
        self.tables = tables;
        self
    }

    /// Interrupt controller quiesce; required for preserve-context images.
    pub fn with_quiesce(mut self, quiesce: &'a mut dyn IrqQuiesce) -> Self {
        self.quiesce = Some(quiesce);
        self
    }

    pub fn with_observer(mut self, observer: &'a mut dyn StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &KexecConfig {
        &self.config
    }

    pub fn cpu(&self) -> &P {
        &self.cpu
    }

    pub fn relocator(&self) -> &R {
        &self.relocator
    }

    /// Arm a transition that replaces this kernel for good.
    pub fn arm_replace<'m>(
        &'m mut self,
        image: &'m mut KexecImage,
    ) -> Result<ReplaceTransition<'m, 'a, P, R, T>> {
        if image.preserve_context {
            return Err(KexecError::ContextPreserved);
        }
        let inner = self.arm(image)?;
        Ok(ReplaceTransition { inner })
    }

    /// Arm a transition that comes back once the destination jumps back.
    pub fn arm_suspend<'m>(
        &'m mut self,
        image: &'m mut KexecImage,
    ) -> Result<SuspendTransition<'m, 'a, P, R, T>> {
        if !image.preserve_context {
            return Err(KexecError::ContextNotPreserved);
        }
        if self.quiesce.is_none() {
            log::warn!("kexec: preserve-context image but no interrupt controller quiesce");
            return Err(KexecError::QuiesceUnavailable);
        }
        let inner = self.arm(image)?;
        Ok(SuspendTransition { inner })
    }

    /// Arm and commit `image`, picking the transition from its
    /// preserve-context flag. Only returns for preserve-context images.
    ///
    /// # Safety
    ///
    /// The image's pages, control page and indirection list must be fully
    /// loaded, and the caller must be the only CPU still running.
    pub unsafe fn machine_kexec(&mut self, image: &mut KexecImage) -> Result<ResumeToken> {
        if image.preserve_context {
            let transition = self.arm_suspend(image)?;
            Ok(unsafe { transition.commit() })
        } else {
            let transition = self.arm_replace(image)?;
            unsafe { transition.commit() }
        }
    }

    fn arm<'m>(&'m mut self, image: &'m mut KexecImage) -> Result<Transition<'m, 'a, P, R, T>> {
        self.config
            .validate()
            .and_then(|()| image.validate())
            .inspect_err(|err| log::warn!("kexec: refusing image: {}", err))?;
        let reserved: &'a ReservedTables = self.tables;
        let tables = reserved.arm()?;
        log::debug!(
            "kexec: armed, entry {:#x}, control page {:#x}, preserve context {}",
            image.start,
            image.control_code_page.as_usize(),
            image.preserve_context
        );

        let mut transition = Transition {
            machine: self,
            image,
            tables,
        };
        transition.machine.report(Stage::Armed);
        Ok(transition)
    }

    fn report(&mut self, stage: Stage) {
        if self.config.trace_stages && stage.may_log() {
            log::trace!("kexec: {}", stage.name());
        }
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_stage(stage);
        }
    }
}

struct Transition<'m, 'a, P, R, T> {
    machine: &'m mut KexecMachine<'a, P, R, T>,
    image: &'m mut KexecImage,
    tables: ArmedTables<'a>,
}

impl<P, R, T> Transition<'_, '_, P, R, T>
where
    P: Processor,
    R: RelocationEntry,
    T: TraceSwitch,
{
    /// Run every stage up to the point of no return.
    unsafe fn enter(&mut self) -> (SavedContext, PageList) {
        let m = &mut *self.machine;
        let preserve = self.image.preserve_context;

        let saved = SavedContext::capture(&mut m.cpu, &mut m.trace, preserve);
        if preserve {
            m.report(Stage::ContextSaved);
        }

        m.cpu.disable_interrupts();
        m.report(Stage::InterruptsDisabled);

        if preserve {
            // Presence was checked when arming.
            if let Some(quiesce) = m.quiesce.as_deref_mut() {
                quiesce_interrupts(quiesce);
            }
            m.report(Stage::LegacyApic);
        }

        let dm = m.config.direct_map();
        let control = self.image.control_code_page;
        let control_va = dm.va(control);
        unsafe { m.relocator.install(control_va, m.config.control_code_max_size) };
        self.tables
            .map_control_page(control, control_va, &dm, m.config.pae);
        let swap_page = match self.image.image_type {
            ImageType::Default => self.image.swap_page,
            ImageType::Crash => None,
        };
        let list = PageList::build(
            control,
            control_va,
            &self.tables.addresses(&dm),
            swap_page,
            m.config.pae,
        );
        m.report(Stage::DescriptionTableBuilt);

        flatten_segments(&mut m.cpu, &m.config);
        m.report(Stage::SegmentsFlattened);

        invalidate_tables(&mut m.cpu, &dm);
        m.report(Stage::DescriptorTablesInvalidated);

        (saved, list)
    }

    fn args<'l>(&self, list: &'l PageList) -> RelocationArgs<'l> {
        RelocationArgs {
            indirection_head: self.image.head,
            page_list: list,
            control_page: self.machine.config.direct_map().va(self.image.control_code_page),
            start: self.image.start,
            has_pae: self.machine.cpu.has_pae(),
            preserve_context: self.image.preserve_context,
        }
    }
}

/// Armed replace transition (`commitReplace`).
pub struct ReplaceTransition<'m, 'a, P, R, T> {
    inner: Transition<'m, 'a, P, R, T>,
}

impl<P, R, T> ReplaceTransition<'_, '_, P, R, T>
where
    P: Processor,
    R: RelocationEntry,
    T: TraceSwitch,
{
    /// Hand the machine to the destination kernel.
    ///
    /// # Safety
    ///
    /// See [`KexecMachine::machine_kexec`].
    pub unsafe fn commit(self) -> ! {
        let mut transition = self.inner;
        // Tracing stays parked; this kernel never runs again.
        let (_saved, list) = unsafe { transition.enter() };
        let args = transition.args(&list);
        transition.machine.report(Stage::Relocated);
        unsafe { transition.machine.relocator.jump(&args) };
        // The routine came back or was never there.
        loop {
            transition.machine.cpu.halt();
        }
    }
}

/// Armed preserve-context transition (`commitAndSuspend`).
pub struct SuspendTransition<'m, 'a, P, R, T> {
    inner: Transition<'m, 'a, P, R, T>,
}

impl<P, R, T> SuspendTransition<'_, '_, P, R, T>
where
    P: Processor,
    R: RelocationEntry,
    T: TraceSwitch,
{
    /// Run the destination kernel and come back once it jumps back.
    ///
    /// The returned entry is also stored in the image's `start`.
    ///
    /// # Safety
    ///
    /// See [`KexecMachine::machine_kexec`].
    pub unsafe fn commit(self) -> ResumeToken {
        let mut transition = self.inner;
        let (saved, list) = unsafe { transition.enter() };
        let args = transition.args(&list);
        transition.machine.report(Stage::Relocated);
        let Some(entry) = (unsafe { transition.machine.relocator.call(&args) }) else {
            loop {
                transition.machine.cpu.halt();
            }
        };

        transition.image.start = entry;
        let m = &mut *transition.machine;
        saved.restore(&mut m.cpu, &mut m.trace);
        m.report(Stage::Resumed);
        ResumeToken { entry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MockIrqQuiesce, MockTraceSwitch, ProcessorContext};
    use crate::descriptor::TablePointer;
    use crate::page_list::{PA_CONTROL_PAGE, PA_PGD, PA_SWAP_PAGE, VA_CONTROL_PAGE};
    use crate::physical::{PhysAddr, VirtAddr};
    use crate::processor::MockProcessor;
    use mockall::Sequence;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    const CONTROL: PhysAddr = PhysAddr::new(0x0123_4000);
    const SWAP: PhysAddr = PhysAddr::new(0x0123_5000);

    #[derive(Debug, Clone, Copy)]
    struct Entered {
        head: usize,
        list: PageList,
        control_page: VirtAddr,
        start: usize,
        has_pae: bool,
        preserve_context: bool,
    }

    #[derive(Default)]
    struct FakeRelocator {
        installed: Option<(VirtAddr, usize)>,
        entered: Option<Entered>,
        jump_back_to: Option<usize>,
    }

    impl FakeRelocator {
        fn record(&mut self, args: &RelocationArgs<'_>) {
            self.entered = Some(Entered {
                head: args.indirection_head,
                list: *args.page_list,
                control_page: args.control_page,
                start: args.start,
                has_pae: args.has_pae,
                preserve_context: args.preserve_context,
            });
        }
    }

    impl RelocationEntry for FakeRelocator {
        unsafe fn install(&mut self, control_page: VirtAddr, max_len: usize) {
            self.installed = Some((control_page, max_len));
        }

        unsafe fn jump(&mut self, args: &RelocationArgs<'_>) {
            self.record(args);
            panic!("relocation entered");
        }

        unsafe fn call(&mut self, args: &RelocationArgs<'_>) -> Option<usize> {
            self.record(args);
            Some(self.jump_back_to.unwrap_or(args.start))
        }
    }

    fn config() -> KexecConfig {
        KexecConfig {
            pae: false,
            trace_stages: true,
            ..KexecConfig::default()
        }
    }

    fn saved_context() -> ProcessorContext {
        ProcessorContext {
            cr0: 0x8005_003b,
            cr3: 0x0077_e000,
            eflags: 0x246,
            gdt: TablePointer::new(0xC180_0000, 0xff),
            idt: TablePointer::new(0xC180_1000, 0x7ff),
            cs: 0x60,
            ss: 0x68,
            ..ProcessorContext::default()
        }
    }

    /// Processor expecting the neutralize sequence and nothing else.
    fn neutralizing_cpu(seq: &mut Sequence) -> MockProcessor {
        let mut cpu = MockProcessor::new();
        cpu.expect_has_pae().return_const(true);
        cpu.expect_disable_interrupts()
            .times(1)
            .in_sequence(seq)
            .return_const(());
        cpu.expect_load_segments()
            .times(1)
            .in_sequence(seq)
            .return_const(());
        cpu.expect_load_gdt()
            .withf(|ptr| ptr.is_empty() && ptr.base == 0xC000_0000)
            .times(1)
            .in_sequence(seq)
            .return_const(());
        cpu.expect_load_idt()
            .withf(|ptr| ptr.is_empty() && ptr.base == 0xC000_0000)
            .times(1)
            .in_sequence(seq)
            .return_const(());
        cpu
    }

    #[test]
    fn test_replace_never_touches_context_or_quiesce() {
        let reserved = Box::new(ReservedTables::new());
        let mut seq = Sequence::new();
        let mut cpu = neutralizing_cpu(&mut seq);
        cpu.expect_save_context().never();
        cpu.expect_restore_context().never();
        let mut trace = MockTraceSwitch::new();
        trace.expect_save_and_disable().times(1).return_const(true);
        trace.expect_restore().never();
        let mut quiesce = MockIrqQuiesce::new();
        quiesce.expect_enter_legacy_mode().never();

        let mut machine = KexecMachine::new(config(), cpu, FakeRelocator::default(), trace)
            .with_tables(&reserved)
            .with_quiesce(&mut quiesce);
        let mut image = KexecImage::new(0x0100_0000, 0x0200_0000, CONTROL).with_swap_page(SWAP);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let transition = machine.arm_replace(&mut image).expect("replace arms");
            unsafe { transition.commit() };
        }));
        assert!(outcome.is_err());

        let entered = machine.relocator().entered.expect("routine entered");
        assert_eq!(entered.head, 0x0200_0000);
        assert_eq!(entered.start, 0x0100_0000);
        assert!(entered.has_pae);
        assert!(!entered.preserve_context);
        assert_eq!(entered.control_page, VirtAddr::new(0xC123_4000));
        assert_eq!(entered.list.get(PA_CONTROL_PAGE), CONTROL.as_usize());
        assert_eq!(entered.list.get(VA_CONTROL_PAGE), 0xC123_4000);
        assert_eq!(entered.list.get(PA_SWAP_PAGE), SWAP.as_usize());
        assert_ne!(entered.list.get(PA_PGD), 0);
        assert_eq!(
            machine.relocator().installed,
            Some((VirtAddr::new(0xC123_4000), 2048))
        );
        // Unwinding dropped the transition, releasing the tables.
        assert!(!reserved.is_armed());
    }

    #[test]
    fn test_suspend_restores_bit_identical_context() {
        let reserved = Box::new(ReservedTables::new());
        let context = saved_context();
        let mut seq = Sequence::new();

        let mut cpu = MockProcessor::new();
        cpu.expect_has_pae().return_const(false);
        cpu.expect_save_context()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(context);
        let mut trace = MockTraceSwitch::new();
        trace
            .expect_save_and_disable()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);
        cpu.expect_disable_interrupts()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let mut quiesce = MockIrqQuiesce::new();
        quiesce
            .expect_enter_legacy_mode()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        cpu.expect_load_segments()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        cpu.expect_load_gdt()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        cpu.expect_load_idt()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        trace
            .expect_restore()
            .withf(|enabled| *enabled)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        cpu.expect_restore_context()
            .withf(move |restored| *restored == context)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut machine = KexecMachine::new(config(), cpu, FakeRelocator::default(), trace)
            .with_tables(&reserved)
            .with_quiesce(&mut quiesce);
        let mut image = KexecImage::new(0x0100_0000, 0x0200_0000, CONTROL)
            .with_type(ImageType::Crash)
            .preserving_context();

        let transition = machine.arm_suspend(&mut image).expect("suspend arms");
        let token = unsafe { transition.commit() };

        assert_eq!(token.entry(), 0x0100_0000);
        assert_eq!(image.start, 0x0100_0000);
        let entered = machine.relocator().entered.expect("routine entered");
        assert!(entered.preserve_context);
        assert_eq!(entered.list.swap_page(), None);
        assert!(!reserved.is_armed());
    }

    #[test]
    fn test_resume_writes_back_new_entry() {
        let reserved = Box::new(ReservedTables::new());
        let mut cpu = MockProcessor::new();
        cpu.expect_has_pae().return_const(false);
        cpu.expect_save_context().return_const(ProcessorContext::default());
        cpu.expect_restore_context().return_const(());
        cpu.expect_disable_interrupts().return_const(());
        cpu.expect_load_segments().return_const(());
        cpu.expect_load_gdt().return_const(());
        cpu.expect_load_idt().return_const(());
        let mut trace = MockTraceSwitch::new();
        trace.expect_save_and_disable().return_const(false);
        trace.expect_restore().return_const(());
        let mut quiesce = MockIrqQuiesce::new();
        quiesce.expect_enter_legacy_mode().return_const(());
        let relocator = FakeRelocator {
            jump_back_to: Some(0x0009_1000),
            ..FakeRelocator::default()
        };

        let mut machine = KexecMachine::new(config(), cpu, relocator, trace)
            .with_tables(&reserved)
            .with_quiesce(&mut quiesce);
        let mut image = KexecImage::new(0x0100_0000, 0, CONTROL)
            .with_swap_page(SWAP)
            .preserving_context();

        let token = unsafe { machine.machine_kexec(&mut image) }.expect("transition resumes");
        assert_eq!(token.entry(), 0x0009_1000);
        assert_eq!(image.start, 0x0009_1000);
    }

    mod thread_log {
        use std::cell::RefCell;

        thread_local! {
            static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
        }

        /// Keeps records per test thread so parallel tests stay apart.
        struct ThreadLog;

        impl log::Log for ThreadLog {
            fn enabled(&self, _: &log::Metadata<'_>) -> bool {
                true
            }

            fn log(&self, record: &log::Record<'_>) {
                LINES.with(|lines| lines.borrow_mut().push(format!("{}", record.args())));
            }

            fn flush(&self) {}
        }

        static LOGGER: ThreadLog = ThreadLog;

        pub fn install() {
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(log::LevelFilter::Trace);
        }

        pub fn take() -> Vec<String> {
            LINES.with(|lines| lines.take())
        }
    }

    #[test]
    fn test_no_logging_while_tables_invalid() {
        thread_log::install();
        let reserved = Box::new(ReservedTables::new());
        let mut cpu = MockProcessor::new();
        cpu.expect_has_pae().return_const(false);
        cpu.expect_save_context().return_const(ProcessorContext::default());
        cpu.expect_restore_context().return_const(());
        cpu.expect_disable_interrupts().return_const(());
        cpu.expect_load_segments().return_const(());
        cpu.expect_load_gdt().return_const(());
        cpu.expect_load_idt().return_const(());
        let mut trace = MockTraceSwitch::new();
        trace.expect_save_and_disable().return_const(true);
        trace.expect_restore().return_const(());
        let mut quiesce = MockIrqQuiesce::new();
        quiesce.expect_enter_legacy_mode().return_const(());

        let mut machine = KexecMachine::new(config(), cpu, FakeRelocator::default(), trace)
            .with_tables(&reserved)
            .with_quiesce(&mut quiesce);
        let mut image = KexecImage::new(0x0100_0000, 0, CONTROL)
            .with_type(ImageType::Crash)
            .preserving_context();
        let _token = unsafe { machine.machine_kexec(&mut image) }.expect("transition resumes");

        let lines = thread_log::take();
        assert!(lines.iter().any(|l| l == "kexec: segments flattened"));
        assert!(lines.iter().any(|l| l == "kexec: resumed"));
        assert!(!lines.iter().any(|l| l == "kexec: descriptor tables invalidated"));
        assert!(!lines.iter().any(|l| l == "kexec: relocated"));
    }

    #[test]
    fn test_logging_suppressed_only_past_point_of_no_return() {
        assert!(Stage::SegmentsFlattened.may_log());
        assert!(!Stage::DescriptorTablesInvalidated.may_log());
        assert!(!Stage::Relocated.may_log());
        assert!(Stage::Resumed.may_log());
    }

    #[test]
    fn test_arm_rejects_mismatched_kind() {
        let reserved = Box::new(ReservedTables::new());
        let mut machine = KexecMachine::new(
            config(),
            MockProcessor::new(),
            FakeRelocator::default(),
            MockTraceSwitch::new(),
        )
        .with_tables(&reserved);

        let mut keep = KexecImage::new(0x0100_0000, 0, CONTROL).preserving_context();
        assert_eq!(
            machine.arm_replace(&mut keep).err().map(|e| e.as_error_code()),
            Some(KexecError::ContextPreserved.as_error_code())
        );
        // No quiesce capability was injected.
        assert_eq!(
            machine.arm_suspend(&mut keep).err().map(|e| e.as_error_code()),
            Some(KexecError::QuiesceUnavailable.as_error_code())
        );

        let mut replace = KexecImage::new(0x0100_0000, 0, CONTROL).with_swap_page(SWAP);
        assert!(matches!(
            machine.arm_suspend(&mut replace),
            Err(KexecError::ContextNotPreserved)
        ));
        assert!(!reserved.is_armed());
    }

    #[test]
    fn test_arm_rejects_invalid_image_without_arming() {
        let reserved = Box::new(ReservedTables::new());
        let mut machine = KexecMachine::new(
            config(),
            MockProcessor::new(),
            FakeRelocator::default(),
            MockTraceSwitch::new(),
        )
        .with_tables(&reserved);

        let mut image = KexecImage::new(0x0100_0000, 0, CONTROL);
        assert!(matches!(
            machine.arm_replace(&mut image),
            Err(KexecError::MissingSwapPage)
        ));
        assert!(!reserved.is_armed());
    }

    #[test]
    fn test_arm_rejects_busy_tables() {
        let reserved = Box::new(ReservedTables::new());
        let held = reserved.arm().expect("first claim");
        let mut machine = KexecMachine::new(
            config(),
            MockProcessor::new(),
            FakeRelocator::default(),
            MockTraceSwitch::new(),
        )
        .with_tables(&reserved);

        let mut image = KexecImage::new(0x0100_0000, 0, CONTROL).with_swap_page(SWAP);
        assert!(matches!(
            machine.arm_replace(&mut image),
            Err(KexecError::TablesBusy)
        ));
        drop(held);
    }

    #[test]
    fn test_stage_names_are_unique() {
        let stages = [
            Stage::Armed,
            Stage::ContextSaved,
            Stage::InterruptsDisabled,
            Stage::LegacyApic,
            Stage::DescriptionTableBuilt,
            Stage::SegmentsFlattened,
            Stage::DescriptorTablesInvalidated,
            Stage::Relocated,
            Stage::Resumed,
        ];
        for (i, a) in stages.iter().enumerate() {
            assert!(stages[i + 1..].iter().all(|b| a.name() != b.name() && a < b));
        }
    }
}
