//! C runtime support emitted at the top of every generated program.
//!
//! Each process instance is a detached-from-CHILL pthread with its own
//! mailbox: a FIFO list guarded by one mutex/condition pair. Senders
//! block while the mailbox is full; RECEIVE CASE scans the queue in
//! arrival order and waits on the same condition when nothing matches.

/// Capacity of a process mailbox and of a BUFFER without a length.
pub const MAILBOX_CAPACITY: u32 = 64;

pub const INCLUDES: &str = "\
#define _POSIX_C_SOURCE 200809L
#include <errno.h>
#include <pthread.h>
#include <stdbool.h>
#include <stddef.h>
#include <stdint.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <time.h>
";

pub const RUNTIME: &str = r#"/* ---- runtime ---- */

#define CHILL_MAILBOX_CAPACITY 64
#define CHILL_MAX_REGION_DEPTH 32

typedef struct chill_message {
    struct chill_message *next;
    int kind;
    size_t size;
    unsigned char payload[];
} chill_message;

typedef struct chill_instance {
    pthread_t thread;
    pthread_mutex_t lock;
    pthread_cond_t cond;
    chill_message *head;
    chill_message *tail;
    size_t count;
    bool stopping;
    bool finished;
    bool joined;
    void (*entry)(void *);
    void *args;
    struct chill_instance *next_started;
} chill_instance;

typedef struct {
    pthread_mutex_t lock;
    pthread_cond_t cond;
    unsigned char *data;
    size_t elem_size;
    size_t capacity;
    size_t head;
    size_t count;
} chill_buffer;

typedef struct {
    pthread_mutex_t lock;
    pthread_cond_t cond;
    unsigned waiting;
    unsigned released;
} chill_event;

static _Thread_local chill_instance *chill_self;
static _Thread_local pthread_mutex_t *chill_held_regions[CHILL_MAX_REGION_DEPTH];
static _Thread_local int chill_held_count;

static pthread_mutex_t chill_instances_lock = PTHREAD_MUTEX_INITIALIZER;
static chill_instance *chill_instances;

static inline void chill_fatal(const char *what, int err)
{
    fprintf(stderr, "chill runtime: %s: %s\n", what, strerror(err));
    exit(2);
}

#define CHILL_CHECK(call)                                                      \
    do {                                                                       \
        int chill_rc_ = (call);                                                \
        if (chill_rc_ != 0)                                                    \
            chill_fatal(#call, chill_rc_);                                     \
    } while (0)

static inline void *chill_alloc(size_t size)
{
    void *p = calloc(1, size ? size : 1);
    if (p == NULL)
        chill_fatal("allocation failed", ENOMEM);
    return p;
}

static inline int64_t chill_mod(int64_t a, int64_t b)
{
    int64_t r = a % b;
    return r < 0 ? r + (b < 0 ? -b : b) : r;
}

static inline int64_t chill_abs(int64_t v)
{
    return v < 0 ? -v : v;
}

static inline int64_t chill_max(int64_t a, int64_t b)
{
    return a > b ? a : b;
}

static inline int64_t chill_min(int64_t a, int64_t b)
{
    return a < b ? a : b;
}

static inline int32_t chill_popcount(uint64_t v)
{
    int32_t n = 0;
    while (v != 0) {
        v &= v - 1;
        n++;
    }
    return n;
}

/* ---- regions ---- */

static inline void chill_region_init(pthread_mutex_t *m)
{
    pthread_mutexattr_t attr;
    CHILL_CHECK(pthread_mutexattr_init(&attr));
    CHILL_CHECK(pthread_mutexattr_settype(&attr, PTHREAD_MUTEX_RECURSIVE));
    CHILL_CHECK(pthread_mutex_init(m, &attr));
    pthread_mutexattr_destroy(&attr);
}

static inline void chill_region_enter(pthread_mutex_t *m)
{
    CHILL_CHECK(pthread_mutex_lock(m));
    if (chill_held_count == CHILL_MAX_REGION_DEPTH)
        chill_fatal("regions nested too deeply", EDEADLK);
    chill_held_regions[chill_held_count++] = m;
}

static inline void chill_region_leave(pthread_mutex_t *m)
{
    if (chill_held_count > 0 && chill_held_regions[chill_held_count - 1] == m)
        chill_held_count--;
    CHILL_CHECK(pthread_mutex_unlock(m));
}

static inline void chill_release_regions(void)
{
    while (chill_held_count > 0)
        CHILL_CHECK(pthread_mutex_unlock(chill_held_regions[--chill_held_count]));
}

/* ---- processes ---- */

/* Terminates the calling process; from the main thread, the program. */
static inline void chill_exit_process(void)
{
    chill_release_regions();
    if (chill_self == NULL) {
        fflush(stdout);
        exit(0);
    }
    pthread_mutex_lock(&chill_self->lock);
    chill_self->finished = true;
    pthread_cond_broadcast(&chill_self->cond);
    pthread_mutex_unlock(&chill_self->lock);
    pthread_exit(NULL);
}

static inline void *chill_trampoline(void *arg)
{
    chill_instance *inst = arg;
    chill_self = inst;
    inst->entry(inst->args);
    chill_exit_process();
    return NULL;
}

static inline chill_instance *chill_start(void (*entry)(void *), const void *args, size_t size,
                                   chill_instance **latest)
{
    chill_instance *inst = chill_alloc(sizeof *inst);
    CHILL_CHECK(pthread_mutex_init(&inst->lock, NULL));
    CHILL_CHECK(pthread_cond_init(&inst->cond, NULL));
    inst->entry = entry;
    inst->args = chill_alloc(size);
    if (size > 0)
        memcpy(inst->args, args, size);
    pthread_mutex_lock(&chill_instances_lock);
    inst->next_started = chill_instances;
    chill_instances = inst;
    *latest = inst;
    CHILL_CHECK(pthread_create(&inst->thread, NULL, chill_trampoline, inst));
    pthread_mutex_unlock(&chill_instances_lock);
    return inst;
}

static inline chill_instance *chill_latest(chill_instance **latest, const char *process)
{
    pthread_mutex_lock(&chill_instances_lock);
    chill_instance *inst = *latest;
    pthread_mutex_unlock(&chill_instances_lock);
    if (inst == NULL) {
        fprintf(stderr, "chill runtime: SEND: no instance of process %s was started\n", process);
        exit(2);
    }
    return inst;
}

static inline void chill_stop(chill_instance *inst)
{
    if (inst == NULL)
        return;
    if (inst == chill_self)
        chill_exit_process();
    pthread_mutex_lock(&inst->lock);
    inst->stopping = true;
    pthread_cond_broadcast(&inst->cond);
    pthread_mutex_unlock(&inst->lock);
}

static inline void chill_join_all(void)
{
    for (;;) {
        pthread_mutex_lock(&chill_instances_lock);
        chill_instance *inst = chill_instances;
        while (inst != NULL && inst->joined)
            inst = inst->next_started;
        if (inst != NULL)
            inst->joined = true;
        pthread_mutex_unlock(&chill_instances_lock);
        if (inst == NULL)
            break;
        CHILL_CHECK(pthread_join(inst->thread, NULL));
    }
}

/* ---- signals ---- */

static inline void chill_send(chill_instance *to, int kind, const void *payload, size_t size)
{
    if (to == NULL)
        chill_fatal("SEND to a NULL instance", EINVAL);
    chill_message *msg = chill_alloc(sizeof *msg + size);
    msg->kind = kind;
    msg->size = size;
    if (size > 0)
        memcpy(msg->payload, payload, size);
    pthread_mutex_lock(&to->lock);
    while (to->count >= CHILL_MAILBOX_CAPACITY && !to->stopping && !to->finished)
        pthread_cond_wait(&to->cond, &to->lock);
    if (to->stopping || to->finished) {
        pthread_mutex_unlock(&to->lock);
        free(msg);
        return;
    }
    if (to->tail != NULL)
        to->tail->next = msg;
    else
        to->head = msg;
    to->tail = msg;
    to->count++;
    pthread_cond_broadcast(&to->cond);
    pthread_mutex_unlock(&to->lock);
}

static inline chill_instance *chill_receiver(void)
{
    if (chill_self == NULL)
        chill_fatal("RECEIVE CASE outside of a process", EINVAL);
    return chill_self;
}

/* Caller holds rx->lock. */
static inline void chill_unlink(chill_instance *rx, chill_message *prev, chill_message *msg)
{
    if (prev != NULL)
        prev->next = msg->next;
    else
        rx->head = msg->next;
    if (rx->tail == msg)
        rx->tail = prev;
    rx->count--;
    msg->next = NULL;
    pthread_cond_broadcast(&rx->cond);
}

/* Caller holds rx->lock. Returns after any mailbox change. */
static inline void chill_wait_message(chill_instance *rx)
{
    if (!rx->stopping)
        pthread_cond_wait(&rx->cond, &rx->lock);
    if (rx->stopping) {
        pthread_mutex_unlock(&rx->lock);
        chill_exit_process();
    }
}

/* ---- time ---- */

static inline void chill_delay(int64_t ms)
{
    if (ms < 0)
        ms = 0;
    if (chill_self == NULL) {
        struct timespec rel = {(time_t)(ms / 1000), (long)(ms % 1000) * 1000000L};
        while (nanosleep(&rel, &rel) != 0 && errno == EINTR) {
        }
        return;
    }
    struct timespec deadline;
    clock_gettime(CLOCK_REALTIME, &deadline);
    deadline.tv_sec += (time_t)(ms / 1000);
    deadline.tv_nsec += (long)(ms % 1000) * 1000000L;
    if (deadline.tv_nsec >= 1000000000L) {
        deadline.tv_sec++;
        deadline.tv_nsec -= 1000000000L;
    }
    chill_instance *self = chill_self;
    pthread_mutex_lock(&self->lock);
    while (!self->stopping) {
        if (pthread_cond_timedwait(&self->cond, &self->lock, &deadline) == ETIMEDOUT)
            break;
    }
    bool stop = self->stopping;
    pthread_mutex_unlock(&self->lock);
    if (stop)
        chill_exit_process();
}

/* ---- buffers ---- */

static inline void chill_buffer_init(chill_buffer *b, size_t elem_size, size_t capacity)
{
    CHILL_CHECK(pthread_mutex_init(&b->lock, NULL));
    CHILL_CHECK(pthread_cond_init(&b->cond, NULL));
    b->data = chill_alloc(elem_size * capacity);
    b->elem_size = elem_size;
    b->capacity = capacity;
    b->head = 0;
    b->count = 0;
}

static inline void chill_buffer_put(chill_buffer *b, const void *value)
{
    pthread_mutex_lock(&b->lock);
    while (b->count == b->capacity)
        pthread_cond_wait(&b->cond, &b->lock);
    memcpy(b->data + ((b->head + b->count) % b->capacity) * b->elem_size, value, b->elem_size);
    b->count++;
    pthread_cond_broadcast(&b->cond);
    pthread_mutex_unlock(&b->lock);
}

static inline void *chill_buffer_get(chill_buffer *b, void *out)
{
    pthread_mutex_lock(&b->lock);
    while (b->count == 0)
        pthread_cond_wait(&b->cond, &b->lock);
    memcpy(out, b->data + b->head * b->elem_size, b->elem_size);
    b->head = (b->head + 1) % b->capacity;
    b->count--;
    pthread_cond_broadcast(&b->cond);
    pthread_mutex_unlock(&b->lock);
    return out;
}

/* ---- events ---- */

static inline void chill_event_init(chill_event *ev)
{
    CHILL_CHECK(pthread_mutex_init(&ev->lock, NULL));
    CHILL_CHECK(pthread_cond_init(&ev->cond, NULL));
    ev->waiting = 0;
    ev->released = 0;
}

static inline void chill_event_wait(chill_event *ev)
{
    pthread_mutex_lock(&ev->lock);
    ev->waiting++;
    while (ev->released == 0)
        pthread_cond_wait(&ev->cond, &ev->lock);
    ev->released--;
    ev->waiting--;
    pthread_mutex_unlock(&ev->lock);
}

/* Wakes one delayed process; no effect when none is waiting. */
static inline void chill_event_continue(chill_event *ev)
{
    pthread_mutex_lock(&ev->lock);
    if (ev->waiting > ev->released) {
        ev->released++;
        pthread_cond_signal(&ev->cond);
    }
    pthread_mutex_unlock(&ev->lock);
}
"#;

/// C keywords and library names generated identifiers must avoid.
pub const RESERVED_C_NAMES: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "bool", "true", "false", "NULL", "main",
    "printf", "fprintf", "fflush", "stdout", "stderr", "exit", "abort", "free", "malloc",
    "calloc", "memcpy", "memcmp", "memset", "strcmp", "strlen", "snprintf", "errno", "time",
    "clock", "nanosleep", "index", "signal", "remove", "rename", "open", "close", "read",
    "write", "select", "wait", "sleep", "assert", "offsetof", "size_t", "int8_t", "int16_t",
    "int32_t", "int64_t", "uint8_t", "uint16_t", "uint32_t", "uint64_t", "_Bool", "_Thread_local",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_constant_matches_runtime() {
        assert!(RUNTIME.contains(&format!("#define CHILL_MAILBOX_CAPACITY {MAILBOX_CAPACITY}")));
    }

    #[test]
    fn runtime_is_self_contained() {
        for needle in ["chill_send(", "chill_unlink(", "chill_wait_message(", "chill_delay(", "chill_join_all("] {
            assert!(RUNTIME.contains(needle), "missing {needle}");
        }
    }
}
